//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Mount routes under the mode's prefix
//! - Wire up middleware (request ID, timeout, tracing)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::health::HealthAggregator;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::{health, location};
use crate::lifecycle::ShutdownSignal;
use crate::places::{ClientError, PlacesClient, PlacesService};
use crate::resilience::RetryPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub places: Arc<PlacesService>,
    pub health: Arc<HealthAggregator>,
}

impl AppState {
    /// Build the places service and health aggregator over one shared client.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ClientError> {
        let client = PlacesClient::new(&config.upstream)?;
        let places = PlacesService::new(
            client.clone(),
            config.circuit_breaker.settings(),
            RetryPolicy::from_config(&config.retries),
        );
        let health = HealthAggregator::new(client, config);

        Ok(Self {
            places: Arc::new(places),
            health: Arc::new(health),
        })
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    pub fn new(config: GatewayConfig) -> Result<Self, ClientError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::from_state(config, state))
    }

    pub fn from_state(config: GatewayConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/location/suggestions", get(location::suggestions))
            .route("/location/geometry", get(location::geometry))
            .route("/location/name", get(location::name))
            .route("/health", get(health::liveness))
            .route("/health/ready", get(health::readiness));

        // Nesting at "" panics.
        let prefix = config.server.mode.api_prefix();
        let app = if prefix.is_empty() {
            api
        } else {
            Router::new().nest(prefix, api)
        };

        app.with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = ?self.config.server.mode,
            prefix = self.config.server.mode.api_prefix(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.fired().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerMode;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server(mode: ServerMode) -> HttpServer {
        let mut config = GatewayConfig::default();
        config.server.mode = mode;
        config.upstream.base_url = "http://127.0.0.1:9".to_string();
        HttpServer::new(config).unwrap()
    }

    async fn get_status(router: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_release_mode_prefixes_routes() {
        let router = server(ServerMode::Release).router();
        assert_eq!(get_status(router.clone(), "/location-autocomplete/health").await, StatusCode::OK);
        assert_eq!(get_status(router, "/health").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_development_mode_serves_at_root() {
        let router = server(ServerMode::Development).router();
        assert_eq!(get_status(router, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let router = server(ServerMode::Development).router();
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_liveness_body() {
        let router = server(ServerMode::Development).router();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_missing_input_is_bad_request() {
        let router = server(ServerMode::Development).router();
        assert_eq!(get_status(router, "/location/suggestions").await, StatusCode::BAD_REQUEST);
    }
}
