//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use location_autocomplete::config::GatewayConfig;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const AUTOCOMPLETE_PATH: &str = "/autocomplete/json";
pub const DETAILS_PATH: &str = "/details/json";

/// Config pointing at `upstream` with zero backoff and a long reset timeout.
pub fn fast_config(upstream: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.base_url = upstream.uri();
    config.upstream.api_key = "test-key".to_string();
    config.upstream.timeout_ms = 2_000;
    config.retries.multiplier_ms = 0;
    config.retries.min_wait_ms = 0;
    config.retries.max_wait_ms = 0;
    config.observability.metrics_enabled = false;
    config
}

/// Answer every request on `route` with `response`.
pub async fn mount(upstream: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(upstream)
        .await;
}

pub fn predictions(items: &[(&str, &str)]) -> Value {
    let predictions: Vec<Value> = items
        .iter()
        .map(|(description, place_id)| json!({"description": description, "place_id": place_id}))
        .collect();
    json!({"predictions": predictions, "status": "OK"})
}

pub async fn upstream_calls(upstream: &MockServer) -> usize {
    upstream.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

/// Issue a GET against an in-process router and decode the JSON body.
pub async fn get_json(router: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, retry_after, body)
}
