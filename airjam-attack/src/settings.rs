//! Live deauthentication settings
//!
//! Values come from the shared [`ParamStore`] and may change while an
//! attack runs. Every accessor re-reads its parameter; when the read fails
//! (unregistered, unparsable) the last good value is kept and a warning is
//! logged, so a typo in the console never stops a running attack.

use airjam_core::{parse_macs, MacAddr, ParamDescriptor, ParamStore, ParameterType, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const PARAM_SKIP: &str = "wifi.deauth.skip";
pub const PARAM_SILENT: &str = "wifi.deauth.silent";
pub const PARAM_OPEN: &str = "wifi.deauth.open";
pub const PARAM_ACQUIRED: &str = "wifi.deauth.acquired";
pub const PARAM_PACKETS: &str = "wifi.deauth.packets";
pub const PARAM_DELAY: &str = "wifi.deauth.delay";
pub const PARAM_BACKOFF: &str = "wifi.tx.backoff";

/// Last known good values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeauthSnapshot {
    pub silent: bool,
    pub open: bool,
    pub acquired: bool,
    /// Sequence numbers (frame pairs) per flow
    pub packets: u32,
    /// Pause after each sequence number
    pub delay: Duration,
    /// Pause after a full transmit buffer
    pub backoff: Duration,
}

impl Default for DeauthSnapshot {
    fn default() -> Self {
        Self {
            silent: false,
            open: true,
            acquired: false,
            packets: 64,
            delay: Duration::ZERO,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Deauthentication settings backed by a parameter store
pub struct DeauthSettings {
    params: Arc<ParamStore>,
    cached: Mutex<DeauthSnapshot>,
}

impl DeauthSettings {
    pub fn new(params: Arc<ParamStore>) -> Self {
        Self {
            params,
            cached: Mutex::new(DeauthSnapshot::default()),
        }
    }

    /// Register every deauthentication parameter with its default
    pub fn register_defaults(params: &ParamStore) -> Result<()> {
        let defaults = DeauthSnapshot::default();

        params.register(
            ParamDescriptor::new(PARAM_SKIP, ParameterType::MacList, "")
                .with_description("Comma separated list of MAC addresses to skip while deauthing"),
        )?;
        params.register(
            ParamDescriptor::new(PARAM_SILENT, ParameterType::Bool, defaults.silent.to_string())
                .with_description("If true, messages from deauth attacks will not be logged"),
        )?;
        params.register(
            ParamDescriptor::new(PARAM_OPEN, ParameterType::Bool, defaults.open.to_string())
                .with_description("Send deauth packets to open networks"),
        )?;
        params.register(
            ParamDescriptor::new(
                PARAM_ACQUIRED,
                ParameterType::Bool,
                defaults.acquired.to_string(),
            )
            .with_description("Send deauth packets from access points with acquired key material"),
        )?;
        params.register(
            ParamDescriptor::new(PARAM_PACKETS, ParameterType::U32, defaults.packets.to_string())
                .with_description("Number of deauth sequence numbers sent to each client"),
        )?;
        params.register(
            ParamDescriptor::new(
                PARAM_DELAY,
                ParameterType::U64,
                defaults.delay.as_millis().to_string(),
            )
            .with_description("Milliseconds to wait after each deauth sequence number"),
        )?;
        params.register(
            ParamDescriptor::new(
                PARAM_BACKOFF,
                ParameterType::U64,
                defaults.backoff.as_millis().to_string(),
            )
            .with_description("Milliseconds to wait when the transmit buffer is full"),
        )?;

        Ok(())
    }

    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    /// Addresses never to deauth
    ///
    /// Unlike the other settings this is not cached: a broken list fails
    /// the attack up front.
    pub fn skip_list(&self) -> Result<HashSet<MacAddr>> {
        parse_macs(&self.params.get_string(PARAM_SKIP)?)
    }

    pub fn silent(&self) -> bool {
        self.refresh(PARAM_SILENT, ParamStore::get_bool, |s| &mut s.silent)
    }

    pub fn open(&self) -> bool {
        self.refresh(PARAM_OPEN, ParamStore::get_bool, |s| &mut s.open)
    }

    pub fn acquired(&self) -> bool {
        self.refresh(PARAM_ACQUIRED, ParamStore::get_bool, |s| &mut s.acquired)
    }

    pub fn packets(&self) -> u32 {
        self.refresh(PARAM_PACKETS, ParamStore::get_u32, |s| &mut s.packets)
    }

    pub fn delay(&self) -> Duration {
        self.refresh(
            PARAM_DELAY,
            |params, key| params.get_u64(key).map(Duration::from_millis),
            |s| &mut s.delay,
        )
    }

    pub fn backoff(&self) -> Duration {
        self.refresh(
            PARAM_BACKOFF,
            |params, key| params.get_u64(key).map(Duration::from_millis),
            |s| &mut s.backoff,
        )
    }

    /// Refresh every value and return them together
    pub fn snapshot(&self) -> DeauthSnapshot {
        DeauthSnapshot {
            silent: self.silent(),
            open: self.open(),
            acquired: self.acquired(),
            packets: self.packets(),
            delay: self.delay(),
            backoff: self.backoff(),
        }
    }

    /// Values as of the last refresh, without touching the store
    pub fn cached(&self) -> DeauthSnapshot {
        *self.cached.lock()
    }

    fn refresh<T, R, F>(&self, key: &str, read: R, field: F) -> T
    where
        T: Copy + fmt::Debug,
        R: FnOnce(&ParamStore, &str) -> Result<T>,
        F: FnOnce(&mut DeauthSnapshot) -> &mut T,
    {
        let mut cached = self.cached.lock();
        let slot = field(&mut *cached);

        match read(&self.params, key) {
            Ok(value) => *slot = value,
            Err(e) => warn!(
                param = key,
                error = %e,
                fallback = ?*slot,
                "Failed to read parameter, keeping previous value"
            ),
        }

        *slot
    }
}

impl fmt::Debug for DeauthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeauthSettings")
            .field("cached", &self.cached())
            .finish()
    }
}
