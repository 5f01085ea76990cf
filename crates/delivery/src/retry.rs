//! Retry policy
//!
//! The wait after attempt `n` (counting from 1) is `2^n` backoff units,
//! capped at `max_backoff`. There is no wait after the last attempt.

use std::time::Duration;

use contracts::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1
    pub fn new(max_attempts: u32, backoff_unit: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
            max_backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_unit_ms),
            Duration::from_secs(config.max_backoff_secs),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `min(2^attempt * unit, max_backoff)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_unit
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Wait before the attempt following `attempt`; `None` once attempts are exhausted
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.backoff_delay(attempt))
    }

    /// Upper bound on the time spent sleeping for one record
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.backoff_delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
