//! Upstream reachability probe.
//!
//! Calls the client directly. A tripped breaker must not hide a recovered
//! upstream, and a probe must not feed the breaker.

use serde_json::Value;

use crate::health::state::HealthProbeResult;
use crate::places::{Operation, PlacesClient};

pub const UPSTREAM: &str = "upstream";

/// One suggestions lookup for `query`; UP iff the reply carries a `predictions` array.
pub async fn probe_upstream(client: &PlacesClient, query: &str) -> HealthProbeResult {
    match client.call(Operation::Suggestions, query).await {
        Ok(payload) if payload.get("predictions").is_some_and(Value::is_array) => HealthProbeResult::up(UPSTREAM),
        Ok(_) => HealthProbeResult::down(UPSTREAM, "response has no predictions"),
        Err(e) => HealthProbeResult::down(UPSTREAM, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::health::state::HealthStatus;
    use serde_json::json;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn probe_with(response: ResponseTemplate) -> HealthProbeResult {
        let server = MockServer::start().await;
        Mock::given(path("/autocomplete/json"))
            .and(query_param("input", "a"))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;

        let client = PlacesClient::new(&UpstreamConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();
        probe_upstream(&client, "a").await
    }

    #[tokio::test]
    async fn test_predictions_array_is_up() {
        let result = probe_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": [], "status": "ZERO_RESULTS"}))).await;
        assert!(result.is_up());
    }

    #[tokio::test]
    async fn test_missing_predictions_is_down() {
        let result = probe_with(ResponseTemplate::new(200).set_body_json(json!({"results": []}))).await;
        assert_eq!(result.status, HealthStatus::Down);
    }

    #[tokio::test]
    async fn test_denied_key_is_down() {
        let result = probe_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [],
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .await;
        assert_eq!(result.status, HealthStatus::Down);
        assert!(result.detail.unwrap().contains("REQUEST_DENIED"));
    }

    #[tokio::test]
    async fn test_server_error_is_down() {
        let result = probe_with(ResponseTemplate::new(500)).await;
        assert_eq!(result.detail.as_deref(), Some("upstream returned HTTP 500"));
    }
}
