//! Places API client.
//!
//! # Responsibilities
//! - Perform exactly one GET per call against the operation's endpoint
//! - Enforce a per-call deadline
//! - Classify every failure (status, transport, envelope, decoding)
//!
//! The client never retries and keeps no state between calls.

use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::places::types::{Operation, UpstreamError};
use crate::resilience::{timeouts, Classify};

/// Errors raised while constructing a [`PlacesClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid upstream base URL '{url}': {source}")]
    InvalidBaseUrl { url: String, source: url::ParseError },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Thin wrapper over `reqwest` bound to one provider and credential.
#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    autocomplete_url: Url,
    details_url: Url,
    api_key: String,
    timeout: Duration,
}

impl PlacesClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientError> {
        let invalid = |source| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        };

        let mut base = Url::parse(&config.base_url).map_err(invalid)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let autocomplete_url = base.join(Operation::Suggestions.path()).map_err(invalid)?;
        let details_url = base.join(Operation::Geometry.path()).map_err(invalid)?;

        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("location-autocomplete/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            autocomplete_url,
            details_url,
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    /// Endpoint serving `operation`.
    pub fn endpoint(&self, operation: Operation) -> &Url {
        match operation {
            Operation::Suggestions => &self.autocomplete_url,
            Operation::Geometry | Operation::Name => &self.details_url,
        }
    }

    /// One upstream round trip; returns the decoded JSON envelope.
    pub async fn call(&self, operation: Operation, input: &str) -> Result<Value, UpstreamError> {
        let started = Instant::now();
        let result = timeouts::with_deadline(self.timeout, self.fetch(operation, input), UpstreamError::Timeout).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_transient() => "transient",
            Err(_) => "permanent",
        };
        metrics::record_upstream_call(operation.as_str(), outcome, started);

        if let Err(e) = &result {
            tracing::warn!(
                operation = %operation,
                class = ?e.failure_class(),
                error = %e,
                elapsed = ?started.elapsed(),
                "Upstream call failed"
            );
        }
        result
    }

    async fn fetch(&self, operation: Operation, input: &str) -> Result<Value, UpstreamError> {
        let response = self
            .http
            .get(self.endpoint(operation).clone())
            .query(&operation.query(input))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                UpstreamError::Malformed(e.without_url().to_string())
            } else {
                transport_error(e)
            }
        })?;

        check_envelope(&payload)?;
        Ok(payload)
    }
}

// The request URL carries the credential, so it is stripped from messages.
fn transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        return UpstreamError::Network(format!("timed out: {}", err.without_url()));
    }
    UpstreamError::Network(err.without_url().to_string())
}

/// Validate the provider's `status` envelope field.
fn check_envelope(payload: &Value) -> Result<(), UpstreamError> {
    let object = payload
        .as_object()
        .ok_or_else(|| UpstreamError::Malformed("expected a JSON object".to_string()))?;

    match object.get("status").and_then(Value::as_str) {
        None | Some("OK") | Some("ZERO_RESULTS") => Ok(()),
        Some(status) => Err(UpstreamError::Rejected {
            status: status.to_string(),
            message: object
                .get("error_message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
    }
}
