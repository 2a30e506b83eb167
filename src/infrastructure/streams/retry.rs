//! Retry policy with exponential backoff for Streams REST reads.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::errors::StreamsApiError;
use crate::domain::errors::DomainError;
use crate::domain::models::RetryConfig;

/// Errors that know whether a retry may help.
pub trait Retryable: Display {
    fn is_transient(&self) -> bool;
}

impl Retryable for StreamsApiError {
    fn is_transient(&self) -> bool {
        StreamsApiError::is_transient(self)
    }
}

impl Retryable for DomainError {
    fn is_transient(&self) -> bool {
        DomainError::is_transient(self)
    }
}

/// Retry policy configuration for handling transient errors
///
/// Backoff doubles with each retry and is capped at `max_backoff_ms`.
/// Only errors reporting [`Retryable::is_transient`] are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute an operation with exponential backoff retry logic
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt, "Operation succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        let backoff = self.calculate_backoff(attempt);
                        warn!(
                            attempt = attempt + 1,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "Transient error, retrying"
                        );
                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        if attempt >= self.max_retries && attempt > 0 {
                            warn!(attempts = attempt + 1, error = %err, "Operation failed after retries");
                        } else {
                            debug!(error = %err, "Permanent error, not retrying");
                        }
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Formula: min(initial_backoff * 2^attempt, max_backoff)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    fn should_retry<E: Retryable>(&self, error: &E, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}
