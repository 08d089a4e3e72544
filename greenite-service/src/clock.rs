//! Wall-clock source for persisted epoch-millisecond timestamps.
//!
//! Timer suspension (queue delays, liveness ticks) goes through tokio time and
//! is virtualized in tests with a paused runtime. Persisted records carry epoch
//! milliseconds instead, so they read time through this trait.

use chrono::Utc;

/// Source of the current time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
