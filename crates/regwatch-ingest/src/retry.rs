//! Bounded retry with exponential backoff for upstream fetches

use regwatch_common::{RegwatchError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Longest pause between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many times, and how patiently, a failed fetch is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub max_retries: u32,

    /// Delay before the first retry; doubles for each later one
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of retries.
///
/// Only errors for which [`RegwatchError::is_retryable`] holds are retried.
/// Exhausting the budget yields [`RegwatchError::RetriesExhausted`] wrapping
/// the last failure.
pub async fn retry_with_backoff<T, F, Fut>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                warn!(
                    label,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            },
            Err(e) if e.is_retryable() && attempt > 0 => {
                error!(label, attempts = attempt + 1, error = %e, "Fetch failed permanently");
                return Err(RegwatchError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: Box::new(e),
                });
            },
            Err(e) => return Err(e),
        }
    }
}
