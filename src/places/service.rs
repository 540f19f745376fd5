//! Resilient invoker for the places operations.
//!
//! # Data Flow
//! ```text
//! suggest / geometry / name
//!     → validate input (rejected before the breaker is consulted)
//!     → lane(op).breaker.call
//!         → lane(op).retry.run
//!             → client.call + payload mapping
//!     → PlacesError::from_outcome on failure
//! ```
//!
//! Payload mapping runs inside the retried call, so a malformed payload is a
//! permanent failure: one upstream call, one breaker failure.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::places::client::{ClientError, PlacesClient};
use crate::places::types::{Coordinates, Operation, PlacesError, PlacesResult, Suggestion, UpstreamError};
use crate::resilience::{BreakerSettings, CircuitBreaker, RetryPolicy};

/// Breaker and retry policy dedicated to one operation.
#[derive(Debug)]
struct Lane {
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl Lane {
    fn new(operation: Operation, settings: BreakerSettings, retry: RetryPolicy) -> Self {
        Self {
            breaker: CircuitBreaker::new(operation.as_str(), settings),
            retry,
        }
    }
}

/// Entry point for all upstream lookups.
pub struct PlacesService {
    client: PlacesClient,
    suggestions: Lane,
    geometry: Lane,
    name: Lane,
}

impl PlacesService {
    pub fn new(client: PlacesClient, breaker: BreakerSettings, retry: RetryPolicy) -> Self {
        Self {
            client,
            suggestions: Lane::new(Operation::Suggestions, breaker, retry),
            geometry: Lane::new(Operation::Geometry, breaker, retry),
            name: Lane::new(Operation::Name, breaker, retry),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ClientError> {
        let client = PlacesClient::new(&config.upstream)?;
        Ok(Self::new(
            client,
            config.circuit_breaker.settings(),
            RetryPolicy::from_config(&config.retries),
        ))
    }

    /// Breaker guarding `operation`.
    pub fn breaker(&self, operation: Operation) -> &CircuitBreaker {
        &self.lane(operation).breaker
    }

    fn lane(&self, operation: Operation) -> &Lane {
        match operation {
            Operation::Suggestions => &self.suggestions,
            Operation::Geometry => &self.geometry,
            Operation::Name => &self.name,
        }
    }

    /// Autocomplete predictions for a partial query.
    pub async fn suggest(&self, query: &str) -> PlacesResult<Vec<Suggestion>> {
        let query = require(query, "query")?;
        self.invoke(Operation::Suggestions, query, parse_suggestions).await
    }

    /// Coordinates of a place.
    pub async fn geometry(&self, place_id: &str) -> PlacesResult<Coordinates> {
        let place_id = require(place_id, "place_id")?;
        self.invoke(Operation::Geometry, place_id, parse_geometry).await
    }

    /// Formatted address of a place.
    pub async fn name(&self, place_id: &str) -> PlacesResult<String> {
        let place_id = require(place_id, "place_id")?;
        self.invoke(Operation::Name, place_id, parse_name).await
    }

    async fn invoke<T>(
        &self,
        operation: Operation,
        input: &str,
        parse: fn(Value) -> Result<T, UpstreamError>,
    ) -> PlacesResult<T> {
        let lane = self.lane(operation);
        let client = &self.client;

        let outcome = lane
            .breaker
            .call(move || {
                lane.retry.run(operation.as_str(), move || async move {
                    let payload = client.call(operation, input).await?;
                    parse(payload)
                })
            })
            .await;

        outcome.map_err(|e| {
            let err = PlacesError::from_outcome(operation, e);
            tracing::debug!(operation = %operation, kind = err.kind().as_str(), error = %err, "Places call failed");
            err
        })
    }
}

fn require<'a>(value: &'a str, field: &str) -> PlacesResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlacesError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

#[derive(Deserialize)]
struct AutocompletePayload {
    predictions: Vec<Suggestion>,
}

#[derive(Deserialize)]
struct DetailsPayload<R> {
    result: R,
}

#[derive(Deserialize)]
struct GeometryResult {
    geometry: GeometryBody,
}

#[derive(Deserialize)]
struct GeometryBody {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct NameResult {
    formatted_address: String,
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, UpstreamError> {
    serde_json::from_value(payload).map_err(|e| UpstreamError::Malformed(e.to_string()))
}

fn parse_suggestions(payload: Value) -> Result<Vec<Suggestion>, UpstreamError> {
    decode::<AutocompletePayload>(payload).map(|p| p.predictions)
}

fn parse_geometry(payload: Value) -> Result<Coordinates, UpstreamError> {
    let location = decode::<DetailsPayload<GeometryResult>>(payload)?.result.geometry.location;
    Ok(Coordinates {
        latitude: location.lat,
        longitude: location.lng,
    })
}

fn parse_name(payload: Value) -> Result<String, UpstreamError> {
    decode::<DetailsPayload<NameResult>>(payload).map(|p| p.result.formatted_address)
}
