//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to upstream for one operation:
//!     → circuit_breaker.rs (admit, or fail fast while open)
//!     → retries.rs (re-attempt transient failures with backoff.rs delays)
//!     → timeouts.rs (every single attempt has a deadline)
//!     → circuit_breaker.rs records the terminal outcome only
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for transient failures (network, 5xx)
//! - Circuit breaker is per operation and sees one outcome per retry sequence
//! - Retry and breaker branch on a [`FailureClass`] tag, never on error types

use serde::Serialize;

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use circuit_breaker::{BreakerError, BreakerSettings, CircuitBreaker, CircuitState, Permit};
pub use retries::{RetryError, RetryPolicy};

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureClass {
    /// Network-level failure expected to resolve on its own.
    Transient,
    /// Failure that will repeat if the same call is made again.
    Permanent,
}

/// Failures that carry their own [`FailureClass`].
pub trait Classify {
    fn failure_class(&self) -> FailureClass;

    fn is_transient(&self) -> bool {
        self.failure_class() == FailureClass::Transient
    }
}
