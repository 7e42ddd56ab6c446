use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Exponential backoff with jitter. Several albums may be rotated in the
/// same pass, so the jitter keeps their retries from landing together.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    /// Three attempts in total.
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_secs: 1,
            max_delay_secs: 10,
        }
    }
}

impl RetryConfig {
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-indexed):
    /// `min(base_delay * 2^retry, max_delay) + random_jitter(0..base_delay)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp_delay = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = exp_delay.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped + jitter)
    }
}

/// Run `operation` until it succeeds, the classifier aborts, or the attempt
/// budget is spent. Returns the last error in the latter two cases.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.total_attempts();
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };
        attempt += 1;
        if classifier(&err) == RetryAction::Abort || attempt >= total_attempts {
            return Err(err);
        }
        let delay = config.delay_for_retry(attempt - 1);
        tracing::warn!(
            attempt,
            total_attempts,
            delay_secs = delay.as_secs(),
            error = %err,
            "Retryable error, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
