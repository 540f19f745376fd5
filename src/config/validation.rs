//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, backoff window ordered, percentages)
//! - Check addresses and the upstream base URL parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::resilience::RetryPolicy;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::new(
                "upstream.base_url",
                format!("'{}' is not an absolute http(s) URL", config.upstream.base_url),
            ));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }
    if config.upstream.timeout_ms == 0 {
        errors.push(ValidationError::new("upstream.timeout_ms", "must be greater than 0"));
    }
    if config.upstream.probe_query.trim().is_empty() {
        errors.push(ValidationError::new("upstream.probe_query", "must not be empty"));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.failure_threshold", "must be at least 1"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.min_wait_ms > retries.max_wait_ms {
        errors.push(ValidationError::new(
            "retries.min_wait_ms",
            format!("{} exceeds max_wait_ms {}", retries.min_wait_ms, retries.max_wait_ms),
        ));
    }
    if !(0.0..=1.0).contains(&retries.jitter_ratio) {
        errors.push(ValidationError::new("retries.jitter_ratio", "must be within 0.0..=1.0"));
    }

    // A request cut short by the server timeout never reaches the breaker.
    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
    let worst_case = RetryPolicy::from_config(retries).worst_case_duration(config.upstream.timeout());
    if !request_timeout.is_zero() && request_timeout <= worst_case {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            format!(
                "{}s does not outlast the worst-case retry sequence of {:?}",
                config.server.request_timeout_secs, worst_case
            ),
        ));
    }

    let cpu_limit = config.health.max_cpu_load_percent;
    if cpu_limit.is_nan() || cpu_limit <= 0.0 {
        errors.push(ValidationError::new("health.max_cpu_load_percent", "must be greater than 0"));
    }
    if !(0.0..=100.0).contains(&config.health.min_disk_free_percent) {
        errors.push(ValidationError::new("health.min_disk_free_percent", "must be within 0..=100"));
    }
    if config.health.disk_path.is_empty() {
        errors.push(ValidationError::new("health.disk_path", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
