//! Shared abstractions for the infusion pump stack.
//!
//! The only seam the controller needs from its environment is time: a
//! monotonic clock it can read for run-elapsed bookkeeping. Keeping the
//! trait here lets `pump_core` stay deterministic under test (inject a
//! manual clock) while the CLI wires in the real one.

use std::time::{Duration, Instant};

/// Monotonic time source used by the controller for run bookkeeping.
///
/// `ms_since` saturates at 0 if `epoch` is in the future, so callers
/// never observe negative elapsed time.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Milliseconds elapsed since `epoch`.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Real monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock for tests; enabled with the `test-util` feature.
#[cfg(feature = "test-util")]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Manually advanced clock: `now() = origin + offset`.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by `d` without sleeping.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }
    }
}
