//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! liveness  → always UP while the process serves requests
//!
//! readiness → liveness
//!           + resources.rs (cpu load, disk free space)
//!           + upstream.rs (one direct suggestions call)
//!           → state.rs (HealthVerdict: ok only if every component is UP)
//! ```
//!
//! # Design Decisions
//! - Probes run on demand and never raise; failures are DOWN values
//! - The upstream probe bypasses breaker and retry
//! - Probes share no mutable state

pub mod aggregator;
pub mod resources;
pub mod state;
pub mod upstream;

pub use aggregator::HealthAggregator;
pub use resources::{ResourceSampler, SystemSampler};
pub use state::{HealthProbeResult, HealthStatus, HealthVerdict, VerdictStatus};
