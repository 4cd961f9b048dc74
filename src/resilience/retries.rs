//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed forward is retried against a fresh backend
//! - Bound the number of retries per request
//!
//! # Design Decisions
//! - Off unless configured; a failed forward normally becomes a gateway error
//! - Only connection failures and timeouts are retryable, never protocol errors
//! - Method is not considered: backends must tolerate duplicates when enabled
//! - No backoff; the retry goes straight to the next scheduled backend

use crate::config::RetryConfig;
use crate::load_balancer::UpstreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self { max_retries: 0 }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        if config.enabled {
            Self {
                max_retries: config.max_retries,
            }
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// `attempt` counts forwards already made for this request, starting at 1.
    pub fn should_retry(&self, attempt: u32, error: &UpstreamError) -> bool {
        attempt <= self.max_retries && is_retryable(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

pub fn is_retryable(error: &UpstreamError) -> bool {
    matches!(
        error,
        UpstreamError::Unreachable { .. } | UpstreamError::Timeout { .. }
    )
}
