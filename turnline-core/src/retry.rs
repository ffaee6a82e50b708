//! Bounded exponential retry.
//!
//! Wraps an asynchronous operation and retries it up to
//! [`RetryConfig::max_attempts`] times total. The short-circuit rule
//! lives in [`EngineError::is_retryable`](crate::error::EngineError::is_retryable):
//! the wrapped operation is responsible for classifying its own failures,
//! this module just stops as soon as one isn't retryable.

use std::time::Duration;

use crate::error::EngineError;
use crate::telemetry::TelemetryClient;

/// Configuration for [`with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first. Defaults to 5.
    pub max_attempts: u8,
    /// Base delay for the exponential backoff (`base * 2^attempt`).
    /// A zero duration is honored — tests rely on this to run instantly.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryConfig {
    /// A config with no backoff delay, for tests.
    #[must_use]
    pub fn no_delay() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::ZERO,
        }
    }
}

/// Run `op` with bounded exponential retry.
///
/// `op` is re-invoked from scratch on each attempt (it owns its own request
/// construction). Stops immediately — without sleeping or retrying again —
/// the first time the error is not [`EngineError::is_retryable`].
pub async fn with_retry<F, Fut, T>(
    config: RetryConfig,
    telemetry: &dyn TelemetryClient,
    mut op: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, EngineError>>,
{
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = err.is_retryable();
                if !retryable || attempt >= config.max_attempts {
                    if retryable {
                        telemetry.track_exception(&err, "withRetries", config.max_attempts);
                        return Err(EngineError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    tracing::debug!(attempt, "retry short-circuited, error is not retryable");
                    return Err(err);
                }
                tracing::warn!(attempt, max = config.max_attempts, "retrying after error");
                if !config.base_delay.is_zero() {
                    let delay = config.base_delay * 2u32.pow(u32::from(attempt - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
