//! Metrics collection and exposition.
//!
//! # Metrics
//! - `places_upstream_requests_total` (counter): upstream round trips by operation, outcome
//! - `places_upstream_duration_seconds` (histogram): upstream latency by operation
//! - `places_retries_total` (counter): retry attempts by operation
//! - `places_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `places_circuit_rejections_total` (counter): fast failures by operation
//! - `places_health_component` (gauge): 1=up, 0=down
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_upstream_call(operation: &'static str, outcome: &'static str, started: Instant) {
    counter!("places_upstream_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
    histogram!("places_upstream_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(operation: &'static str) {
    counter!("places_retries_total", "operation" => operation).increment(1);
}

pub fn record_circuit_state(operation: &'static str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("places_circuit_state", "operation" => operation).set(value);
}

pub fn record_circuit_rejection(operation: &'static str) {
    counter!("places_circuit_rejections_total", "operation" => operation).increment(1);
}

pub fn record_health_component(component: &str, up: bool) {
    gauge!("places_health_component", "component" => component.to_string()).set(if up { 1.0 } else { 0.0 });
}
