//! Radio channel arbitration
//!
//! Every attack that needs the radio on a given channel goes through one
//! [`ChannelArbiter`], so two attacks never retune the adapter under each
//! other's feet.

use airjam_core::Radio;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Serializes channel changes and the work done on each channel
pub struct ChannelArbiter {
    radio: Arc<dyn Radio>,
    lock: Mutex<()>,
}

impl ChannelArbiter {
    pub fn new(radio: Arc<dyn Radio>) -> Self {
        Self {
            radio,
            lock: Mutex::new(()),
        }
    }

    /// Run `work` with exclusive use of the radio tuned to `channel`
    ///
    /// Channel 0 (unknown) leaves the radio where it is. A failed channel
    /// change is logged and `work` still runs on whatever channel the radio
    /// is on. The radio stays on `channel` afterwards.
    pub async fn on_channel<F, Fut, T>(&self, channel: u32, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock.lock().await;
        self.tune(channel).await;
        work().await
    }

    /// Like [`on_channel`](Self::on_channel), unless `cancelled` holds once
    /// the arbiter is ours
    ///
    /// A caller queued behind another user may have been cancelled while
    /// waiting; it then gets `None` and the radio is not retuned.
    pub async fn on_channel_unless<C, F, Fut, T>(
        &self,
        channel: u32,
        cancelled: C,
        work: F,
    ) -> Option<T>
    where
        C: FnOnce() -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock.lock().await;
        if cancelled() {
            debug!(channel, "Cancelled while waiting for the radio, not tuning");
            return None;
        }

        self.tune(channel).await;
        Some(work().await)
    }

    async fn tune(&self, channel: u32) {
        let current = self.radio.channel();
        if channel == 0 || current == Some(channel) {
            return;
        }

        match self.radio.set_channel(channel).await {
            Ok(()) => debug!(
                interface = %self.radio.name(),
                from = ?current,
                to = channel,
                "Channel hop"
            ),
            Err(e) => warn!(
                interface = %self.radio.name(),
                channel,
                error = %e,
                "Failed to set channel"
            ),
        }
    }
}

impl std::fmt::Debug for ChannelArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelArbiter")
            .field("radio", &self.radio.name())
            .finish()
    }
}
