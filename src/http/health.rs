//! Health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::health::{HealthVerdict, VerdictStatus};
use crate::http::server::AppState;

/// Body of the liveness endpoint, `{"status": "ok"}` while the process serves.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: VerdictStatus,
}

pub async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    let status = if state.health.liveness().is_up() {
        VerdictStatus::Ok
    } else {
        VerdictStatus::Error
    };
    Json(LivenessResponse { status })
}

/// 200 when every component is UP, 503 otherwise. The body is the full verdict either way.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthVerdict>) {
    let verdict = state.health.readiness().await;
    let status = if verdict.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(verdict))
}
