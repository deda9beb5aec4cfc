//! Time source for pacing and status refresh.

use std::thread;
use std::time::Instant;

/// Where "now" comes from, and how to wait for a deadline.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block until `deadline`. Returns at once if it has passed.
    fn sleep_until(&self, deadline: Instant);
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;
