//! Self-correcting rate limiting.

use std::time::Duration;

/// Paces one worker toward a target change rate.
///
/// After every batch the worker compares how many changes it has made with
/// how many the target rate allows for the elapsed time, and sleeps off any
/// surplus. A worker that falls behind is never penalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throttle {
    rate_per_ms: f64,
}

impl Throttle {
    /// Throttle to `rate` changes per second.
    pub fn per_second(rate: f64) -> Self {
        Self {
            rate_per_ms: rate / 1000.0,
        }
    }

    /// Changes the target rate allows after `elapsed`.
    pub fn expected_changes(&self, elapsed: Duration) -> f64 {
        elapsed.as_secs_f64() * 1000.0 * self.rate_per_ms
    }

    /// Changes made beyond what the target rate allows (negative when behind).
    pub fn excess_changes(&self, elapsed: Duration, changes: u64) -> f64 {
        changes as f64 - self.expected_changes(elapsed)
    }

    /// How long to sleep so that `changes` after `elapsed` matches the rate.
    pub fn required_delay(&self, elapsed: Duration, changes: u64) -> Option<Duration> {
        if self.rate_per_ms <= 0.0 {
            return None;
        }
        let excess = self.excess_changes(elapsed, changes);
        if excess > 0.0 {
            Some(Duration::from_secs_f64(excess / self.rate_per_ms / 1000.0))
        } else {
            None
        }
    }
}
