//! On-demand radio activation
//!
//! An attack may be launched while the radio is down (nobody is sniffing).
//! The first holder opens it, and the last one to finish closes it again.
//! A radio that was already up when the first holder arrived is left alone.

use airjam_core::{Radio, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::info;

#[derive(Debug, Default)]
struct LeaseState {
    holders: usize,
    on_demand: bool,
}

/// Reference counted hold on an active radio
pub struct RadioLease {
    radio: Arc<dyn Radio>,
    state: Mutex<LeaseState>,
    /// Serializes activation
    gate: AsyncMutex<()>,
    drained: Notify,
}

impl RadioLease {
    pub fn new(radio: Arc<dyn Radio>) -> Self {
        Self {
            radio,
            state: Mutex::new(LeaseState::default()),
            gate: AsyncMutex::new(()),
            drained: Notify::new(),
        }
    }

    /// Take a hold, activating the radio if it is down
    ///
    /// On error no hold is taken.
    pub async fn acquire(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.state.lock().holders += 1;

        if !self.radio.is_active() {
            if let Err(e) = self.radio.activate().await {
                self.release();
                return Err(e);
            }
            self.state.lock().on_demand = true;
            info!(interface = %self.radio.name(), "Radio activated on demand");
        }

        Ok(())
    }

    /// Drop a hold; the last one closes a radio opened on demand
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.holders = state.holders.saturating_sub(1);
        if state.holders > 0 {
            return;
        }

        if state.on_demand {
            state.on_demand = false;
            self.radio.deactivate();
            info!(interface = %self.radio.name(), "Radio released");
        }
        drop(state);

        self.drained.notify_waiters();
    }

    pub fn holders(&self) -> usize {
        self.state.lock().holders
    }

    /// Was the radio opened by this lease?
    pub fn is_on_demand(&self) -> bool {
        self.state.lock().on_demand
    }

    /// Wait until nobody holds the lease
    pub async fn drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.holders() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for RadioLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RadioLease")
            .field("radio", &self.radio.name())
            .field("holders", &state.holders)
            .field("on_demand", &state.on_demand)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airjam_core::mock::MockRadio;
    use std::time::Duration;

    #[tokio::test]
    async fn test_on_demand_activation_once() {
        let radio = Arc::new(MockRadio::new());
        let lease = RadioLease::new(radio.clone());

        lease.acquire().await.unwrap();
        lease.acquire().await.unwrap();
        assert_eq!(radio.activations(), 1);
        assert!(lease.is_on_demand());

        lease.release();
        assert!(radio.is_active());
        lease.release();
        assert!(!radio.is_active());
        assert_eq!(radio.deactivations(), 1);
        assert!(!lease.is_on_demand());
    }

    #[tokio::test]
    async fn test_active_radio_left_alone() {
        let radio = Arc::new(MockRadio::active());
        let lease = RadioLease::new(radio.clone());

        lease.acquire().await.unwrap();
        lease.release();

        assert!(radio.is_active());
        assert_eq!(radio.activations(), 0);
        assert_eq!(radio.deactivations(), 0);
    }

    #[tokio::test]
    async fn test_activation_failure_takes_no_hold() {
        let radio = Arc::new(MockRadio::new());
        radio.fail_activation(true);
        let lease = RadioLease::new(radio.clone());

        assert!(lease.acquire().await.is_err());
        assert_eq!(lease.holders(), 0);
    }

    #[tokio::test]
    async fn test_drained_wakes_on_last_release() {
        let radio = Arc::new(MockRadio::new());
        let lease = Arc::new(RadioLease::new(radio));
        lease.acquire().await.unwrap();

        let releaser = {
            let lease = lease.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                lease.release();
            })
        };

        tokio::time::timeout(Duration::from_secs(2), lease.drained())
            .await
            .unwrap();
        assert_eq!(lease.holders(), 0);
        releaser.await.unwrap();
    }
}
