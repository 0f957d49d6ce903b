//! Retry policy with linear backoff for transient server errors.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use tubeup_common::{Error, Result, TRANSIENT_STATUSES};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `n` units.
    pub backoff_unit: Duration,
    /// HTTP statuses worth retrying.
    pub retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Create a policy with the default delay unit and statuses.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_unit: Duration::from_secs(5),
            retryable_statuses: TRANSIENT_STATUSES.to_vec(),
        }
    }

    /// Set the backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff_unit.saturating_mul(retry)
    }

    /// Check if an error is retryable.
    ///
    /// Only HTTP failures with a listed status qualify; transport errors are
    /// fatal.
    pub fn is_retryable(&self, err: &Error) -> bool {
        err.status()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of
    /// retries.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if retry > 0 {
                        debug!("Operation succeeded after {} retries", retry);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !self.is_retryable(&err) {
                        return Err(err);
                    }

                    retry += 1;
                    if retry > self.max_retries {
                        warn!("Giving up after {} retries: {}", self.max_retries, err);
                        return Err(err);
                    }

                    let delay = self.delay_for_retry(retry);
                    warn!("Retry {} of {} in {:?}: {}", retry, self.max_retries, delay, err);
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
