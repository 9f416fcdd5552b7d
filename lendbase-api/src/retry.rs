//! Retry policy for transient upstream failures.

use crate::config::ApiConfig;
use std::time::Duration;

/// Bounded retry with a fixed backoff interval.
///
/// Only server-reported temporary unavailability (502/503/504) is retried.
/// Malformed responses and business errors fail immediately, and
/// transport-level errors propagate as-is. The same bound applies to
/// mutating calls; exhausting it there is an ambiguous outcome, not an
/// invitation to retry further (see [`crate::ApiError::Communication`]).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum physical attempts per logical request.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Whether a failure status signals temporary upstream unavailability.
    pub fn is_transient_status(status: u16) -> bool {
        matches!(status, 502 | 503 | 504)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}
