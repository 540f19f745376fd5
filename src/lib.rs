//! Location autocomplete gateway library.
//!
//! Forwards place autocomplete, geometry and name lookups to a single
//! upstream provider behind per-operation circuit breakers and bounded
//! retries, and reports liveness and readiness.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod places;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use health::HealthAggregator;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use places::{PlacesError, PlacesService};
