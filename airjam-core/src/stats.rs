//! Injection statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time view of [`InjectionStats`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionSnapshot {
    /// Frames handed to the radio successfully
    pub packets_sent: u64,
    /// Bytes handed to the radio successfully
    pub bytes_sent: u64,
    /// Failed transmissions, backpressure included
    pub errors: u64,
    /// Failed transmissions caused by a full transmit buffer
    pub backpressure: u64,
    /// Time since the counters were created or reset
    pub duration: Duration,
    /// Average send rate over `duration`
    pub packets_per_second: f64,
}

impl InjectionSnapshot {
    /// Format statistics as human-readable string
    pub fn format(&self) -> String {
        format!(
            "Sent: {} frames ({} bytes)\n\
             Errors: {} ({} backpressure)\n\
             Duration: {:.2}s\n\
             Rate: {:.2} pps",
            self.packets_sent,
            self.bytes_sent,
            self.errors,
            self.backpressure,
            self.duration.as_secs_f64(),
            self.packets_per_second
        )
    }
}

/// Thread-safe transmit counters shared by every injector
#[derive(Debug)]
pub struct InjectionStats {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    errors: AtomicU64,
    backpressure: AtomicU64,
    started_at: parking_lot::Mutex<Instant>,
}

impl InjectionStats {
    pub fn new() -> Self {
        Self {
            packets_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            backpressure: AtomicU64::new(0),
            started_at: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one frame of `bytes` length sent
    pub fn record_sent(&self, bytes: u64) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed transmission
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transmission refused because the TX buffer was full
    pub fn record_backpressure(&self) {
        self.backpressure.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn backpressure(&self) -> u64 {
        self.backpressure.load(Ordering::Relaxed)
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> InjectionSnapshot {
        let packets_sent = self.packets_sent();
        let duration = self.started_at.lock().elapsed();
        let secs = duration.as_secs_f64();

        InjectionSnapshot {
            packets_sent,
            bytes_sent: self.bytes_sent(),
            errors: self.errors(),
            backpressure: self.backpressure(),
            duration,
            packets_per_second: if secs > 0.0 {
                packets_sent as f64 / secs
            } else {
                0.0
            },
        }
    }

    /// Reset all counters and the rate clock
    pub fn reset(&self) {
        self.packets_sent.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.backpressure.store(0, Ordering::Relaxed);
        *self.started_at.lock() = Instant::now();
    }
}

impl Default for InjectionStats {
    fn default() -> Self {
        Self::new()
    }
}
