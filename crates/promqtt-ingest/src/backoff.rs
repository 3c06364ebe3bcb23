//! Reconnect backoff for the MQTT session.

use std::time::Duration;

/// Exponential delay between reconnect attempts, doubling from `min`
/// up to `max` and resetting on a successful connection.
#[derive(Debug)]
pub struct ReconnectBackoff {
    /// Delay before the next attempt.
    current: Duration,
    min: Duration,
    max: Duration,
    consecutive_failures: u32,
}

impl ReconnectBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            current: min,
            min,
            max,
            consecutive_failures: 0,
        }
    }

    /// Record a failed attempt and return how long to wait before the next.
    pub fn record_failure(&mut self) -> Duration {
        let delay = self.current;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.current = self
            .current
            .checked_mul(2)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }

    /// Connection re-established: start again from `min`.
    pub fn reset(&mut self) {
        self.current = self.min;
        self.consecutive_failures = 0;
    }

    pub fn next_delay(&self) -> Duration {
        self.current
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
