//! Elapsed-Time Helper
//!
//! Small monotonic timer used for heartbeat bookkeeping: a stored reference
//! instant plus threshold comparisons. No side effects beyond the reference.

use std::time::{Duration, Instant};

/// Monotonic elapsed-time helper.
///
/// Wraps a reference [`Instant`] that can be reset and compared against a
/// threshold. The `*_at` variants take an explicit "now" so callers driving
/// the session from a synthetic clock (tests, deterministic simulations)
/// get exact control over elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    reference: Instant,
}

impl Timer {
    /// Starts a timer referenced to the current instant.
    pub fn start() -> Self {
        Timer {
            reference: Instant::now(),
        }
    }

    /// Starts a timer referenced to the given instant.
    pub fn start_at(now: Instant) -> Self {
        Timer { reference: now }
    }

    /// Resets the reference instant to now.
    pub fn reset(&mut self) {
        self.reference = Instant::now();
    }

    /// Resets the reference instant to the given instant.
    pub fn reset_at(&mut self, now: Instant) {
        self.reference = now;
    }

    /// Time elapsed since the reference instant.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// Time between the reference instant and `now`.
    ///
    /// Saturates to zero if `now` is earlier than the reference.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.reference)
    }

    /// Returns true if more than `threshold` has elapsed.
    pub fn exceeds(&self, threshold: Duration) -> bool {
        self.exceeds_at(Instant::now(), threshold)
    }

    /// Returns true if more than `threshold` elapsed between the reference
    /// instant and `now`.
    pub fn exceeds_at(&self, now: Instant, threshold: Duration) -> bool {
        self.elapsed_at(now) > threshold
    }
}
