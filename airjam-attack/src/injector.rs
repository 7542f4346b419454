//! Raw frame injection
//!
//! Transmission failures never abort an attack: they are classified,
//! logged and counted, and the caller moves on to the next frame.

use crate::settings::DeauthSettings;
use airjam_core::{InjectionStats, MacAddr, Radio};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

/// Pause after every injected frame so the adapter can keep up
pub const TX_PAUSE: Duration = Duration::from_millis(10);

/// What a frame belongs to, for log messages
#[derive(Debug, Clone, Copy)]
pub struct FlowLabel<'a> {
    pub operation: &'static str,
    pub essid: &'a str,
    pub bssid: MacAddr,
    pub station: MacAddr,
}

/// Pushes frames out of the radio and accounts for the outcome
pub struct PacketInjector {
    radio: Arc<dyn Radio>,
    stats: Arc<InjectionStats>,
    settings: Arc<DeauthSettings>,
}

impl PacketInjector {
    pub fn new(
        radio: Arc<dyn Radio>,
        stats: Arc<InjectionStats>,
        settings: Arc<DeauthSettings>,
    ) -> Self {
        Self {
            radio,
            stats,
            settings,
        }
    }

    pub fn stats(&self) -> &Arc<InjectionStats> {
        &self.stats
    }

    /// Transmit one frame
    ///
    /// A full transmit buffer costs an extra backoff sleep; any other error
    /// is only logged. Every call ends with [`TX_PAUSE`].
    pub async fn inject(&self, frame: &[u8], label: &FlowLabel<'_>) {
        match self.radio.transmit(frame) {
            Ok(()) => self.stats.record_sent(frame.len() as u64),
            Err(e) if e.is_backpressure() => {
                debug!(
                    operation = label.operation,
                    essid = %label.essid,
                    bssid = %label.bssid,
                    station = %label.station,
                    error = %e,
                    "Transmit buffer full, backing off"
                );
                self.stats.record_backpressure();
                sleep(self.settings.backoff()).await;
            }
            Err(e) => {
                error!(
                    operation = label.operation,
                    essid = %label.essid,
                    bssid = %label.bssid,
                    station = %label.station,
                    error = %e,
                    "Could not inject frame"
                );
                self.stats.record_error();
            }
        }

        sleep(TX_PAUSE).await;
    }
}

impl std::fmt::Debug for PacketInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketInjector")
            .field("radio", &self.radio.name())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
