/// Cancellable retry with linear backoff
///
/// Used where a write can race the backend's policy propagation, e.g. the
/// profile insert issued right after sign-up. Each attempt waits
/// `base_delay * attempt` before trying again; the whole sequence aborts as
/// soon as the [`CancellationToken`] fires.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry outcome when the operation did not succeed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryError<E> {
    /// The token fired before the operation succeeded
    #[error("Operation cancelled")]
    Cancelled,

    /// The last attempt failed, either with a non-retryable error or after
    /// the retry budget ran out
    #[error("{0}")]
    Failed(E),
}

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay unit; attempt `n` waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::profile_bootstrap()
    }
}

impl RetryPolicy {
    /// 3 retries at 500ms, 1000ms, 1500ms
    pub fn profile_bootstrap() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// No retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `op` until it succeeds, fails with an error `should_retry`
    /// rejects, exhausts the budget, or `cancel` fires
    pub async fn run<T, E, F, Fut, R>(
        &self,
        cancel: &CancellationToken,
        should_retry: R,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = op() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= self.max_retries || !should_retry(&err) {
                return Err(RetryError::Failed(err));
            }

            attempt += 1;
            let delay = self.delay_for(attempt);
            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after failure"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
