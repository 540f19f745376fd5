//! Places subsystem.
//!
//! # Data Flow
//! ```text
//! service.rs (validate input, pick the operation's lane)
//!     → resilience (breaker → retry)
//!     → client.rs (one GET, classified failure)
//!     → service.rs maps the payload into types.rs shapes
//! ```

pub mod client;
pub mod service;
pub mod types;

pub use client::{ClientError, PlacesClient};
pub use service::PlacesService;
pub use types::{Coordinates, ErrorKind, Operation, PlacesError, PlacesResult, Suggestion, UpstreamError};
