//! WPA handshake capture state
//!
//! The sniffer feeds EAPOL key messages in as it sees them; attacks only
//! look at the derived booleans.

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct HandshakeState {
    /// M1 (AP -> station, ANonce)
    challenges: u32,
    /// M2 (station -> AP, SNonce + MIC)
    responses: u32,
    /// M3 (AP -> station, install)
    confirmations: u32,
    beacon: bool,
    pmkid: Option<Vec<u8>>,
}

/// Handshake material captured for one station
#[derive(Debug, Default)]
pub struct Handshake {
    state: RwLock<HandshakeState>,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_challenge(&self) {
        self.state.write().challenges += 1;
    }

    pub fn add_response(&self) {
        self.state.write().responses += 1;
    }

    pub fn add_confirmation(&self) {
        self.state.write().confirmations += 1;
    }

    /// A beacon of the AP was stored next to the EAPOL frames
    pub fn set_beacon(&self) {
        self.state.write().beacon = true;
    }

    pub fn set_pmkid(&self, pmkid: Vec<u8>) {
        self.state.write().pmkid = Some(pmkid);
    }

    /// M1, M2 and M3 all captured
    pub fn complete(&self) -> bool {
        let state = self.state.read();
        state.challenges > 0 && state.responses > 0 && state.confirmations > 0
    }

    /// M1 and M2 captured, enough for offline cracking on most tools
    pub fn half(&self) -> bool {
        let state = self.state.read();
        state.challenges > 0 && state.responses > 0
    }

    pub fn has_pmkid(&self) -> bool {
        self.state.read().pmkid.is_some()
    }

    pub fn pmkid(&self) -> Option<Vec<u8>> {
        self.state.read().pmkid.clone()
    }

    pub fn has_beacon(&self) -> bool {
        self.state.read().beacon
    }

    /// Anything at all worth saving
    pub fn any(&self) -> bool {
        let state = self.state.read();
        state.challenges > 0
            || state.responses > 0
            || state.confirmations > 0
            || state.pmkid.is_some()
    }
}
