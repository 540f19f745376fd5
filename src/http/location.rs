//! Location lookup handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::places::Suggestion;

#[derive(Debug, Deserialize)]
pub struct SuggestionsParams {
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceParams {
    #[serde(default)]
    pub place_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeometryResponse {
    pub latitude: f64,
    pub longitude: f64,
    /// WKT point, longitude first.
    pub geometry: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NameResponse {
    pub name: String,
}

pub async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsParams>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let suggestions = state.places.suggest(&params.input).await?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

pub async fn geometry(
    State(state): State<AppState>,
    Query(params): Query<PlaceParams>,
) -> Result<Json<GeometryResponse>, ApiError> {
    let coords = state.places.geometry(&params.place_id).await?;
    Ok(Json(GeometryResponse {
        latitude: coords.latitude,
        longitude: coords.longitude,
        geometry: coords.wkt_point(),
    }))
}

pub async fn name(
    State(state): State<AppState>,
    Query(params): Query<PlaceParams>,
) -> Result<Json<NameResponse>, ApiError> {
    let name = state.places.name(&params.place_id).await?;
    Ok(Json(NameResponse { name }))
}
