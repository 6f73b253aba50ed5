//! Monotonic time adapter.
//!
//! Implements [`Clock`] on top of `std::time::Instant`.  Milliseconds are
//! counted from adapter construction, so the first reading is near zero.

use std::time::Instant;

use crate::app::ports::Clock;

pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Microseconds since construction (saturates at `u64::MAX`).
    pub fn uptime_us(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1000
    }
}
