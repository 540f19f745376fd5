//! Retry logic.
//!
//! # Responsibilities
//! - Re-attempt transient failures with bounded exponential backoff
//! - Stop immediately on success or permanent failure
//! - Report exhaustion with the last observed failure
//!
//! # Design Decisions
//! - Never retry permanent failures (4xx, malformed payloads)
//! - The backoff sleep is a plain await; dropping the future cancels it
//! - Callers above the retry loop see one terminal outcome per sequence

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::resilience::Classify;

/// Terminal failure of a retry sequence.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed transiently.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The sequence stopped without using up its attempts: the failure was
    /// permanent, or the policy allows a single attempt.
    #[error(transparent)]
    Stopped(E),
}

impl<E> RetryError<E> {
    /// The last failure observed, whichever way the sequence ended.
    pub fn into_last(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Stopped(err) => err,
        }
    }
}

/// One failed attempt inside a retry sequence.
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// 1-based attempt number.
    pub number: u32,
    /// Delay before the next attempt.
    pub delay: Duration,
    /// Backoff accumulated so far, including `delay`.
    pub total_backoff: Duration,
    pub error: &'a E,
}

impl<E: fmt::Display> RetryAttempt<'_, E> {
    fn log(&self, operation: &'static str) {
        tracing::info!(
            operation,
            attempt = self.number,
            delay = ?self.delay,
            total_backoff = ?self.total_backoff,
            error = %self.error,
            "Retrying upstream call"
        );
    }
}

/// Bounded retry policy for one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }

    /// Longest a whole sequence can take when every attempt runs for `per_attempt`.
    pub fn worst_case_duration(&self, per_attempt: Duration) -> Duration {
        let waits: Duration = (1..self.max_attempts).map(|attempt| self.backoff.max_delay(attempt)).sum();
        per_attempt.saturating_mul(self.max_attempts).saturating_add(waits)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut attempt = 1;
        let mut total_backoff = Duration::ZERO;

        loop {
            let err = match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation, attempt, "Upstream call recovered after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() || self.max_attempts == 1 {
                return Err(RetryError::Stopped(err));
            }
            if attempt >= self.max_attempts {
                tracing::warn!(operation, attempts = attempt, error = %err, "Retry attempts exhausted");
                return Err(RetryError::Exhausted { attempts: attempt, last: err });
            }

            let delay = self.backoff.delay(attempt);
            total_backoff += delay;
            RetryAttempt {
                number: attempt,
                delay,
                total_backoff,
                error: &err,
            }
            .log(operation);
            metrics::record_retry(operation);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::default())
    }
}
