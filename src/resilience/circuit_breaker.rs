//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: testing if upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= threshold
//! Open → Half-Open: first call after reset timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (open-since refreshed)
//! ```
//!
//! # Design Decisions
//! - One breaker per operation (not global)
//! - Fail fast in Open state; rejections never touch the state
//! - Single trial call in Half-Open
//! - Admission hands out a [`Permit`]; dropping it unsettled records nothing

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Tuning for a single breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,
    /// Dwell time in Open before a trial call is allowed.
    pub reset_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The call was short-circuited; the wrapped future never ran.
    #[error("circuit for '{operation}' is open, retry in {retry_after:?}")]
    Open {
        operation: &'static str,
        retry_after: Duration,
    },

    /// The call ran and failed; the failure has been recorded.
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { since: Instant },
    HalfOpen { trial_in_flight: bool },
}

#[derive(Debug)]
struct BreakerInner {
    phase: Phase,
    consecutive_failures: u32,
}

/// Per-operation circuit breaker.
///
/// All bookkeeping happens under one mutex which is never held across an await,
/// so concurrent outcomes for the same operation are never lost.
#[derive(Debug)]
pub struct CircuitBreaker {
    operation: &'static str,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(operation: &'static str, settings: BreakerSettings) -> Self {
        let settings = BreakerSettings {
            failure_threshold: settings.failure_threshold.max(1),
            ..settings
        };
        metrics::record_circuit_state(operation, CircuitState::Closed);
        Self {
            operation,
            settings,
            inner: Mutex::new(BreakerInner {
                phase: Phase::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.lock().phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Run `call` under the breaker, recording its outcome.
    ///
    /// If the returned future is dropped before `call` completes, no outcome is recorded.
    pub async fn call<T, E, F, Fut>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire().map_err(|retry_after| BreakerError::Open {
            operation: self.operation,
            retry_after,
        })?;

        match call().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure();
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Ask to make a call. `Err` carries how long until a trial may be admitted.
    pub fn acquire(&self) -> Result<Permit<'_>, Duration> {
        let mut inner = self.lock();
        let phase = inner.phase;
        match phase {
            Phase::Closed => Ok(Permit::new(self, false)),
            Phase::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.settings.reset_timeout {
                    inner.phase = Phase::HalfOpen { trial_in_flight: true };
                    drop(inner);
                    tracing::info!(operation = self.operation, "Circuit half-open, admitting trial call");
                    metrics::record_circuit_state(self.operation, CircuitState::HalfOpen);
                    Ok(Permit::new(self, true))
                } else {
                    drop(inner);
                    metrics::record_circuit_rejection(self.operation);
                    Err(self.settings.reset_timeout - elapsed)
                }
            }
            Phase::HalfOpen { trial_in_flight: true } => {
                drop(inner);
                metrics::record_circuit_rejection(self.operation);
                Err(Duration::ZERO)
            }
            Phase::HalfOpen { trial_in_flight: false } => {
                inner.phase = Phase::HalfOpen { trial_in_flight: true };
                Ok(Permit::new(self, true))
            }
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        let closed = trial && matches!(inner.phase, Phase::HalfOpen { .. });
        if closed {
            inner.phase = Phase::Closed;
        }
        drop(inner);

        if closed {
            tracing::info!(operation = self.operation, "Circuit closed after successful trial call");
            metrics::record_circuit_state(self.operation, CircuitState::Closed);
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        let phase = inner.phase;
        let opened = match phase {
            Phase::Closed => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                inner.consecutive_failures >= self.settings.failure_threshold
            }
            Phase::HalfOpen { .. } if trial => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                true
            }
            // Outcome of a call admitted before the circuit opened.
            _ => false,
        };
        if opened {
            inner.phase = Phase::Open { since: Instant::now() };
        }
        let failures = inner.consecutive_failures;
        drop(inner);

        if opened {
            tracing::warn!(
                operation = self.operation,
                consecutive_failures = failures,
                reset_timeout = ?self.settings.reset_timeout,
                trial,
                "Circuit opened"
            );
            metrics::record_circuit_state(self.operation, CircuitState::Open);
        }
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        let released = match &mut inner.phase {
            Phase::HalfOpen { trial_in_flight } => {
                *trial_in_flight = false;
                true
            }
            _ => false,
        };
        drop(inner);

        if released {
            tracing::debug!(operation = self.operation, "Trial call abandoned, slot released");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission ticket for one call through a [`CircuitBreaker`].
///
/// Settle it with [`Permit::record_success`] or [`Permit::record_failure`].
/// Dropping it unsettled records no outcome and frees a held trial slot.
#[must_use]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// True when this permit is the single half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            BreakerSettings {
                failure_threshold: threshold,
                reset_timeout: Duration::from_secs(30),
            },
        )
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.call(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.call(|| async { Ok::<_, &'static str>(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold_and_fails_fast() {
        let cb = breaker(3);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let res = cb
                .call(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("boom")
                })
                .await;
            assert!(matches!(res, Err(BreakerError::Inner("boom"))));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let res = cb
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(())
            })
            .await;
        assert!(matches!(res, Err(BreakerError::Open { operation: "test", .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "open circuit must not run the call");
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let cb = breaker(5);
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.consecutive_failures(), 3);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.consecutive_failures(), 0);

        for _ in 0..2 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 2);
    }

    #[tokio::test]
    async fn test_interleaved_success_keeps_default_breaker_closed() {
        let cb = breaker(3);
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        succeed(&cb).await.unwrap();
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_waits_for_reset_timeout() {
        let cb = breaker(1);
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(29)).await;
        match succeed(&cb).await {
            Err(BreakerError::Open { retry_after, .. }) => {
                assert_eq!(retry_after, Duration::from_secs(1));
            }
            other => panic!("expected fast failure, got {:?}", other),
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        let permit = cb.acquire().expect("trial should be admitted");
        assert!(permit.is_trial());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        permit.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_do_not_refresh_open_since() {
        let cb = breaker(1);
        let _ = fail(&cb).await;

        for _ in 0..10 {
            tokio::time::advance(Duration::from_secs(2)).await;
            assert!(matches!(succeed(&cb).await, Err(BreakerError::Open { .. })));
        }
        // 20s of rejections, 10s more reaches the original deadline.
        tokio::time::advance(Duration::from_secs(10)).await;
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_and_rearms() {
        let cb = breaker(2);
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(matches!(fail(&cb).await, Err(BreakerError::Inner("boom"))));
        assert_eq!(cb.state(), CircuitState::Open);

        // Clock restarted at the trial failure.
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open { .. })));
        tokio::time::advance(Duration::from_secs(10)).await;
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_trial() {
        let cb = breaker(1);
        let _ = fail(&cb).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let trial = cb.acquire().expect("first caller gets the trial");
        assert_eq!(cb.acquire().unwrap_err(), Duration::ZERO);
        trial.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_trial_records_nothing() {
        let cb = breaker(1);
        let _ = fail(&cb).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let trial = cb.acquire().unwrap();
        drop(trial);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.consecutive_failures(), 1);

        let next = cb.acquire().expect("slot must be free again");
        assert!(next.is_trial());
        next.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_call_records_nothing() {
        let cb = breaker(1);
        let call = cb.call(|| async {
            std::future::pending::<()>().await;
            Err::<(), &'static str>("never")
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), call).await;
        assert!(timed_out.is_err());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_all_counted() {
        let cb = Arc::new(breaker(1_000));
        let mut tasks = Vec::new();
        for _ in 0..100 {
            let cb = cb.clone();
            tasks.push(tokio::spawn(async move {
                let _ = cb
                    .call(|| async {
                        tokio::task::yield_now().await;
                        Err::<(), _>("boom")
                    })
                    .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(cb.consecutive_failures(), 100);
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
