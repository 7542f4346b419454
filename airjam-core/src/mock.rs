//! Scriptable in-memory radio for tests

use crate::{Error, Radio, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Failure to inject on the next `transmit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxFailure {
    /// Transmit buffer full (`EAGAIN`)
    Backpressure,
    /// Anything else (adapter gone, driver error)
    Fatal,
}

/// Radio that records frames and channel changes instead of touching hardware
#[derive(Debug, Default)]
pub struct MockRadio {
    active: AtomicBool,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    channel: AtomicU32,
    channel_history: Mutex<Vec<u32>>,
    frames: Mutex<Vec<Vec<u8>>>,
    failures: Mutex<VecDeque<TxFailure>>,
    fail_activation: AtomicBool,
    fail_set_channel: AtomicBool,
    activation_delay: Mutex<Duration>,
}

impl MockRadio {
    /// Closed radio; attacks have to open it on demand
    pub fn new() -> Self {
        Self::default()
    }

    /// Radio already opened by someone else
    pub fn active() -> Self {
        let radio = Self::default();
        radio.active.store(true, Ordering::SeqCst);
        radio
    }

    /// Queue a failure for an upcoming `transmit`
    pub fn fail_next(&self, failure: TxFailure) {
        self.failures.lock().push_back(failure);
    }

    pub fn fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    /// Make `activate` take this long, like a slow driver bringing the adapter up
    pub fn set_activation_delay(&self, delay: Duration) {
        *self.activation_delay.lock() = delay;
    }

    pub fn fail_set_channel(&self, fail: bool) {
        self.fail_set_channel.store(fail, Ordering::SeqCst);
    }

    /// Frames transmitted successfully, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    /// Every channel the radio was tuned to, in order
    pub fn channel_history(&self) -> Vec<u32> {
        self.channel_history.lock().clone()
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Radio for MockRadio {
    fn name(&self) -> &str {
        "mock0"
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn activate(&self) -> Result<()> {
        let delay = *self.activation_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(Error::Interface("mock0: activation refused".to_string()));
        }
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.deactivations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn channel(&self) -> Option<u32> {
        match self.channel.load(Ordering::SeqCst) {
            0 => None,
            ch => Some(ch),
        }
    }

    async fn set_channel(&self, channel: u32) -> Result<()> {
        if self.fail_set_channel.load(Ordering::SeqCst) {
            return Err(Error::Interface(format!("mock0: cannot tune to {}", channel)));
        }
        self.channel.store(channel, Ordering::SeqCst);
        self.channel_history.lock().push(channel);
        Ok(())
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Interface("mock0 is not active".to_string()));
        }

        match self.failures.lock().pop_front() {
            Some(TxFailure::Backpressure) => Err(Error::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                "Resource temporarily unavailable",
            ))),
            Some(TxFailure::Fatal) => Err(Error::Io(io::Error::from(io::ErrorKind::NetworkDown))),
            None => {
                self.frames.lock().push(frame.to_vec());
                Ok(())
            }
        }
    }
}
