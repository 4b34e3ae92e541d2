// HLS Retry Utility: bounded attempts with linear backoff for segment fetching.

use crate::DownloadError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Unit of the linear backoff. The wait after attempt `n` (1-based) is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Result of a single attempt, used by the caller to signal retryability.
pub enum RetryAction<T> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed with a retryable error (network, non-2xx, timeout).
    Retry(DownloadError),
    /// Operation failed with an error another attempt cannot fix.
    Fail(DownloadError),
}

/// Execute an async operation with retry-and-backoff.
///
/// The `operation` closure receives the current attempt number (1-based).
/// When attempts run out, or an attempt fails permanently, the last error is
/// wrapped in [`DownloadError::Fetch`] naming `url`. No wait follows the final
/// attempt. Cancelling `token` interrupts a pending backoff.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    url: &str,
    operation: F,
) -> Result<T, DownloadError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = RetryAction<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        if token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let err = match operation(attempt).await {
            RetryAction::Success(value) => return Ok(value),
            RetryAction::Fail(err) => return Err(exhausted(url, attempt, err)),
            RetryAction::Retry(err) => err,
        };

        if attempt >= max_attempts {
            return Err(exhausted(url, attempt, err));
        }

        let delay = policy.delay_after_attempt(attempt);
        warn!(
            url,
            attempt,
            max = max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after transient error"
        );
        tokio::select! {
            _ = token.cancelled() => {
                return Err(DownloadError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

fn exhausted(url: &str, attempts: u32, err: DownloadError) -> DownloadError {
    DownloadError::Fetch {
        url: url.to_string(),
        attempts,
        source: Box::new(err),
    }
}
