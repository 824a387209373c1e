//! Bounded, immediate retries.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors that can say whether another attempt might succeed.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Which failures consume another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Retry every failure until attempts run out.
    #[default]
    Any,
    /// Stop at the first failure that is not transient (bad key, bad request).
    Transient,
}

/// Attempt budget applied uniformly to every translated field.
///
/// Retries are immediate; there is no backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_on: RetryOn::Any,
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    /// Attempts actually made, including the successful one.
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_on: RetryOn) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_on,
        }
    }

    fn should_retry<E: Retryable>(&self, error: &E) -> bool {
        match self.retry_on {
            RetryOn::Any => true,
            RetryOn::Transient => error.is_transient(),
        }
    }

    /// Run `operation` until it succeeds or the policy gives up.
    ///
    /// The closure receives the 1-based attempt number. Every failure is
    /// logged with `label` and the attempt counter.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        "{} failed ({}/{}): {}",
                        label,
                        attempt,
                        max_attempts,
                        e
                    );
                    if attempt >= max_attempts || !self.should_retry(&e) {
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                        };
                    }
                }
            }
        }
    }
}
