//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether an upstream attempt is worth repeating
//! - Bound the number of attempts per fetch
//!
//! # Design Decisions
//! - Only GET routes are proxied, so every request is idempotent
//! - 429 and any 5xx are transient; other statuses are final
//! - Transport errors (no response at all) are retryable
//! - No delay between attempts unless backoff is configured

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Returns true for statuses that indicate a transient upstream failure.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Attempt budget and pacing for one upstream fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retries.saturating_add(1),
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn has_budget(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Whether a completed attempt with `status` should be retried.
    pub fn should_retry(&self, attempt: u32, status: u16) -> bool {
        self.has_budget(attempt) && is_retryable_status(status)
    }

    /// Delay before the attempt following `attempt`. Zero when backoff is disabled.
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.backoff_base_ms == 0 {
            return Duration::ZERO;
        }
        calculate_backoff(attempt, self.backoff_base_ms, self.backoff_max_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}
