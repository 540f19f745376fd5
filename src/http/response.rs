//! Error responses.
//!
//! # Responsibilities
//! - Map places errors to HTTP status codes
//! - Render `{"error": <kind>, "detail": <message>}` bodies
//! - Advertise `Retry-After` while a circuit is open

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::places::{PlacesError, UpstreamError};

/// Handler error wrapping a [`PlacesError`].
#[derive(Debug)]
pub struct ApiError(pub PlacesError);

impl From<PlacesError> for ApiError {
    fn from(err: PlacesError) -> Self {
        Self(err)
    }
}

/// Status code for a places error.
pub fn status_for(err: &PlacesError) -> StatusCode {
    match err {
        PlacesError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PlacesError::PermanentUpstream { source, .. } if is_caller_fault(source) => StatusCode::BAD_REQUEST,
        PlacesError::PermanentUpstream { .. }
        | PlacesError::TransientUpstream { .. }
        | PlacesError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        PlacesError::RetryExhausted { .. } | PlacesError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn is_caller_fault(source: &UpstreamError) -> bool {
    match source {
        UpstreamError::Rejected { status, .. } => status == "INVALID_REQUEST",
        _ => source.http_status().is_some_and(|status| (400..500).contains(&status)),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!(kind = self.0.kind().as_str(), error = %self.0, "Request failed");
        }

        let body = Json(json!({
            "error": self.0.kind(),
            "detail": self.0.to_string(),
        }));
        let mut response = (status, body).into_response();

        if let PlacesError::CircuitOpen { retry_after, .. } = &self.0 {
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
