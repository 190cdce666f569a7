//! Monotonic source of "now" in UTC milliseconds.
//!
//! The engine never reads the system clock directly; tests inject a
//! manual clock and advance it explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Current time as UTC milliseconds since the epoch.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline(always)]
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Test clock advanced by hand.
#[derive(Debug)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(AtomicU64::new(start_ms))
    }

    pub fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, delta: u64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn advance_secs(&self, delta: u64) {
        self.advance_ms(delta * 1_000);
    }
}

impl Clock for ManualClock {
    #[inline(always)]
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
