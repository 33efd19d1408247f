use async_trait::async_trait;
use std::time::Duration;

use crate::domain::ports::Sleeper;

/// Backoff policy for webhook delivery.
/// Failed attempts are followed by exponentially growing, capped delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    base_delay: Duration,

    max_delay: Duration,
}

impl RetryStrategy {
    /// Create a new retry strategy
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// 1 second base unit, capped at 30 seconds
    pub fn default_strategy() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }

    /// Delay to wait before the 1-based attempt `attempt`.
    ///
    /// Zero before the first attempt, then `min(2^(n-1) * base, cap)`.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        2_u32
            .checked_pow(attempt - 1)
            .and_then(|multiplier| self.base_delay.checked_mul(multiplier))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Every delay a sequence of `max_attempts` could incur, first attempt included
    pub fn schedule(&self, max_attempts: u32) -> Vec<Duration> {
        (1..=max_attempts)
            .map(|attempt| self.delay_before_attempt(attempt))
            .collect()
    }

    /// Worst-case time spent sleeping across a full sequence
    pub fn total_backoff(&self, max_attempts: u32) -> Duration {
        self.schedule(max_attempts).into_iter().sum()
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::default_strategy()
    }
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
