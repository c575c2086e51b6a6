//! Retry policy with exponential backoff for transient fetch failures.

use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum attempts per URL (first try plus retries)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Build from the configured attempt bound, keeping default delays
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Backoff delay before retry number `attempt` (1-based: the delay after the
/// first failed try is `initial_delay`).
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    if attempt <= 1 {
        return config.initial_delay;
    }
    let exp = config.initial_delay.as_secs_f64()
        * config.backoff_multiplier.powf(f64::from(attempt - 1));
    Duration::from_secs_f64(exp.min(config.max_delay.as_secs_f64()))
}
