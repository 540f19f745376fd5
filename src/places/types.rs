//! Operation identifiers, result shapes and error definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::{BreakerError, Classify, FailureClass, RetryError};

/// One resilient call type. Each owns its own breaker and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Suggestions,
    Geometry,
    Name,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Suggestions => "suggestions",
            Operation::Geometry => "geometry",
            Operation::Name => "name",
        }
    }

    /// Endpoint path relative to the upstream base URL.
    pub(crate) fn path(self) -> &'static str {
        match self {
            Operation::Suggestions => "autocomplete/json",
            Operation::Geometry | Operation::Name => "details/json",
        }
    }

    /// Operation-specific query parameters for `input`, excluding the credential.
    pub(crate) fn query<'a>(self, input: &'a str) -> [(&'static str, &'a str); 2] {
        match self {
            Operation::Suggestions => [("sensor", "false"), ("input", input)],
            Operation::Geometry => [("fields", "geometry"), ("place_id", input)],
            Operation::Name => [("fields", "formatted_address"), ("place_id", input)],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single autocomplete prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub description: String,
    pub place_id: String,
}

/// Latitude/longitude of a place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Well-known-text point, longitude first.
    pub fn wkt_point(&self) -> String {
        format!("POINT({} {})", self.longitude, self.latitude)
    }
}

/// Failure of a single upstream round trip.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// Connection, TLS or body transfer failure.
    #[error("upstream request failed: {0}")]
    Network(String),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    /// Non-2xx HTTP status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// 2xx response whose envelope status reports an error.
    #[error("upstream rejected the request with status {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Rejected {
        status: String,
        message: Option<String>,
    },

    /// Body could not be decoded or lacks required fields.
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// HTTP status returned by the upstream, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

impl Classify for UpstreamError {
    fn failure_class(&self) -> FailureClass {
        match self {
            UpstreamError::Network(_) | UpstreamError::Timeout(_) => FailureClass::Transient,
            UpstreamError::Status(status) if *status >= 500 => FailureClass::Transient,
            UpstreamError::Status(_) => FailureClass::Permanent,
            UpstreamError::Rejected { status, .. } if status == "UNKNOWN_ERROR" => FailureClass::Transient,
            UpstreamError::Rejected { .. } | UpstreamError::Malformed(_) => FailureClass::Permanent,
        }
    }
}

/// Machine-readable error kind for the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientUpstream,
    PermanentUpstream,
    RetryExhausted,
    CircuitOpen,
    MalformedResponse,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransientUpstream => "transient_upstream",
            ErrorKind::PermanentUpstream => "permanent_upstream",
            ErrorKind::RetryExhausted => "retry_exhausted",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

/// Errors surfaced by the places service.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Transient failure with no retry budget (single-attempt policy).
    #[error("{operation}: {source}")]
    TransientUpstream {
        operation: Operation,
        source: UpstreamError,
    },

    #[error("{operation}: {source}")]
    PermanentUpstream {
        operation: Operation,
        source: UpstreamError,
    },

    #[error("{operation}: gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        operation: Operation,
        attempts: u32,
        #[source]
        last: UpstreamError,
    },

    #[error("{operation}: circuit open, retry in {retry_after:?}")]
    CircuitOpen {
        operation: Operation,
        retry_after: Duration,
    },

    #[error("{operation}: malformed upstream response: {reason}")]
    MalformedResponse { operation: Operation, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PlacesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlacesError::TransientUpstream { .. } => ErrorKind::TransientUpstream,
            PlacesError::PermanentUpstream { .. } => ErrorKind::PermanentUpstream,
            PlacesError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            PlacesError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            PlacesError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            PlacesError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Classify a single upstream failure that ended the call without exhausting retries.
    pub fn from_upstream(operation: Operation, source: UpstreamError) -> Self {
        match source {
            UpstreamError::Malformed(reason) => PlacesError::MalformedResponse { operation, reason },
            source if source.is_transient() => PlacesError::TransientUpstream { operation, source },
            source => PlacesError::PermanentUpstream { operation, source },
        }
    }

    /// Translate the terminal outcome of `breaker(retry(client))`.
    pub fn from_outcome(operation: Operation, outcome: BreakerError<RetryError<UpstreamError>>) -> Self {
        match outcome {
            BreakerError::Open { retry_after, .. } => PlacesError::CircuitOpen { operation, retry_after },
            BreakerError::Inner(RetryError::Exhausted { attempts, last }) => PlacesError::RetryExhausted {
                operation,
                attempts,
                last,
            },
            BreakerError::Inner(RetryError::Stopped(source)) => Self::from_upstream(operation, source),
        }
    }
}

/// Result type for places operations.
pub type PlacesResult<T> = Result<T, PlacesError>;
