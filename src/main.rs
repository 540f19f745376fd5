//! Location autocomplete gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http (axum, request id, timeout, trace)
//!                 │
//!                 ├─▶ places::PlacesService
//!                 │      └─▶ per-operation lane: circuit breaker ─▶ retry ─▶ PlacesClient ──▶ Places API
//!                 │
//!                 └─▶ health::HealthAggregator
//!                        ├─▶ cpu / disk (sysinfo)
//!                        └─▶ PlacesClient (direct, no breaker) ──▶ Places API
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use location_autocomplete::config::loader;
use location_autocomplete::lifecycle::{signals, Shutdown};
use location_autocomplete::observability::{logging, metrics};
use location_autocomplete::HttpServer;

#[derive(Parser)]
#[command(name = "location-autocomplete")]
#[command(version, about = "Resilient gateway for place autocomplete lookups", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = loader::load(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "location-autocomplete starting");

    if config.upstream.api_key.is_empty() {
        tracing::warn!("No upstream API key configured; upstream calls will be rejected");
    }

    tracing::info!(
        bind_address = %config.server.bind_address,
        mode = ?config.server.mode,
        failure_threshold = config.circuit_breaker.failure_threshold,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
