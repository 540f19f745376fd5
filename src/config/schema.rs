//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::Backoff;
use crate::resilience::circuit_breaker::BreakerSettings;

/// Root configuration for the location autocomplete gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound HTTP server settings.
    pub server: ServerConfig,

    /// Upstream places provider settings.
    pub upstream: UpstreamConfig,

    /// Per-operation circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Resource probe thresholds.
    pub health: HealthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment mode; decides the route prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Development,
    Release,
}

impl ServerMode {
    /// Path prefix every route is mounted under.
    pub fn api_prefix(self) -> &'static str {
        match self {
            ServerMode::Development => "",
            ServerMode::Release => "/location-autocomplete",
        }
    }
}

impl std::str::FromStr for ServerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(ServerMode::Development),
            "release" => Ok(ServerMode::Release),
            other => Err(format!("unknown server mode '{}'", other)),
        }
    }
}

/// Inbound server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Development serves routes at the root, release under `/location-autocomplete`.
    pub mode: ServerMode,

    /// Whole-request timeout in seconds. Must outlast a full retry sequence.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mode: ServerMode::Development,
            request_timeout_secs: 60,
        }
    }
}

/// Upstream places provider configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL the operation paths are resolved against.
    pub base_url: String,

    /// Provider API credential.
    pub api_key: String,

    /// Deadline for a single upstream round trip in milliseconds.
    pub timeout_ms: u64,

    /// Input used by the upstream reachability probe.
    pub probe_query: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            api_key: String::new(),
            timeout_ms: 10_000,
            probe_query: "a".to_string(),
        }
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_ms", &self.timeout_ms)
            .field("probe_query", &self.probe_query)
            .finish()
    }
}

/// Circuit breaker configuration, applied to each operation independently.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive terminal failures that trip the breaker.
    pub failure_threshold: u32,

    /// Minimum time spent open before a trial call is let through, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,

    /// Exponential backoff multiplier in milliseconds.
    pub multiplier_ms: u64,

    /// Lower bound of the backoff window in milliseconds.
    pub min_wait_ms: u64,

    /// Upper bound of the backoff window in milliseconds.
    pub max_wait_ms: u64,

    /// Extra random delay as a fraction of the computed delay (0.0 disables).
    pub jitter_ratio: f64,
}

impl RetryConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.multiplier_ms),
            Duration::from_millis(self.min_wait_ms),
            Duration::from_millis(self.max_wait_ms),
        )
        .with_jitter(self.jitter_ratio)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_ms: 1_000,
            min_wait_ms: 2_000,
            max_wait_ms: 6_000,
            jitter_ratio: 0.0,
        }
    }
}

/// Resource probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// 1-minute load average per logical CPU, in percent, above which the CPU probe fails.
    pub max_cpu_load_percent: f64,

    /// Free space percentage below which the disk probe fails.
    pub min_disk_free_percent: f64,

    /// Path whose filesystem is checked by the disk probe.
    pub disk_path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_cpu_load_percent: 90.0,
            min_disk_free_percent: 10.0,
            disk_path: "/".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let config = GatewayConfig::default();
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.settings().reset_timeout, Duration::from_secs(30));
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.min_wait_ms, 2_000);
        assert_eq!(config.retries.max_wait_ms, 6_000);
        assert_eq!(config.server.mode.api_prefix(), "");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let raw = r#"
            [server]
            mode = "release"

            [circuit_breaker]
            failure_threshold = 5
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.server.mode, ServerMode::Release);
        assert_eq!(config.server.mode.api_prefix(), "/location-autocomplete");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.reset_timeout_ms, 30_000);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = UpstreamConfig {
            api_key: "secret-key".to_string(),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_server_mode_parse() {
        assert_eq!("Release".parse::<ServerMode>(), Ok(ServerMode::Release));
        assert_eq!("development".parse::<ServerMode>(), Ok(ServerMode::Development));
        assert!("staging".parse::<ServerMode>().is_err());
    }
}
