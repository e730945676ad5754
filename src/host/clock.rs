//! Clock implementations

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::Clock;

/// Wall clock, unix seconds in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep a
/// handle while the `Host` owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Move time forward. Going backwards is ignored so the clock stays
    /// nondecreasing.
    pub fn set(&self, timestamp: i64) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        if seconds > 0 {
            self.now.fetch_add(seconds, Ordering::SeqCst);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
