//! Bounded race-with-retry
//!
//! Races each attempt of a unit of work against a fixed timeout. A timed-out
//! attempt is dropped (which cancels it) and the work is re-invoked from
//! scratch, up to `max_attempts` times. Any result the work produces before
//! its timeout, success or domain error, is returned as-is.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::ClientError;

/// Per-attempt timeout
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts used for EVM `block_number` / `filter_logs` / `transaction_by_hash`
pub const EVM_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError<E> {
    #[error("too many retries ({0} attempts timed out)")]
    TooManyRetries(u32),

    #[error("retry cancelled")]
    Cancelled,

    #[error("{0}")]
    Inner(E),
}

impl From<RetryError<ClientError>> for ClientError {
    fn from(e: RetryError<ClientError>) -> Self {
        match e {
            RetryError::TooManyRetries(n) => ClientError::TooManyRetries(n),
            RetryError::Cancelled => ClientError::Cancelled,
            RetryError::Inner(inner) => inner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_attempts: EVM_MAX_ATTEMPTS,
        }
    }
}

/// Run `work` until it completes within `policy.timeout`.
///
/// `work` is called once per attempt; after `policy.max_attempts` timeouts the
/// call fails with [`RetryError::TooManyRetries`] and `work` is not called
/// again. Cancelling `cancel` aborts the in-flight attempt.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut work: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = tokio::time::timeout(policy.timeout, work()) => outcome,
        };

        match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => return Err(RetryError::Inner(e)),
            Err(_elapsed) => {
                warn!(
                    attempt = attempts,
                    max_attempts,
                    timeout_ms = policy.timeout.as_millis() as u64,
                    "Attempt timed out"
                );
                if attempts >= max_attempts {
                    return Err(RetryError::TooManyRetries(attempts));
                }
            }
        }
    }
}
