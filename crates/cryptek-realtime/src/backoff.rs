//! Reconnect policy: a fixed ceiling with linear backoff.

use std::time::Duration;

/// Decides whether and when to retry after an abnormal closure.
///
/// Attempt `n` (1-based) waits `base_delay * n`. Once `max_attempts`
/// retries have been made without a successful open, the policy stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl ReconnectPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Given the retries already made since the last successful open,
    /// return the next attempt number and its delay, or `None` at the
    /// ceiling.
    pub fn next(&self, attempts_so_far: u32) -> Option<(u32, Duration)> {
        if attempts_so_far >= self.max_attempts {
            return None;
        }
        let attempt = attempts_so_far + 1;
        Some((attempt, self.delay_for(attempt)))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}
