//! Configuration loading from disk and the environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Provider credential.
pub const ENV_API_KEY: &str = "GOOGLE_PLACES_API_KEY";
/// `development` or `release`.
pub const ENV_SERVER_MODE: &str = "LOCATION_AUTOCOMPLETE_SERVER_MODE";
/// Port for the inbound listener.
pub const ENV_SERVER_PORT: &str = "LOCATION_AUTOCOMPLETE_SERVER_PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then `.env` and process environment, then validation.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    // A missing .env file is the normal case in production.
    let _ = dotenvy::dotenv();

    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables on top of file configuration.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_API_KEY) {
        config.upstream.api_key = key;
    }

    if let Some(mode) = lookup(ENV_SERVER_MODE) {
        config.server.mode = mode.parse().map_err(|message| ConfigError::Env {
            var: ENV_SERVER_MODE,
            message,
        })?;
    }

    if let Some(port) = lookup(ENV_SERVER_PORT) {
        let port: u16 = port.trim().parse().map_err(|e| ConfigError::Env {
            var: ENV_SERVER_PORT,
            message: format!("'{}': {}", port, e),
        })?;
        let mut addr: SocketAddr = config.server.bind_address.parse().map_err(|_| ConfigError::Env {
            var: ENV_SERVER_PORT,
            message: format!("cannot apply port to bind address '{}'", config.server.bind_address),
        })?;
        addr.set_port(port);
        config.server.bind_address = addr.to_string();
    }

    Ok(())
}
