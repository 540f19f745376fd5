//! Liveness and readiness aggregation.

use std::path::PathBuf;

use crate::config::{GatewayConfig, HealthConfig};
use crate::health::resources::{self, ResourceSampler, SystemSampler};
use crate::health::state::{HealthProbeResult, HealthVerdict};
use crate::health::upstream;
use crate::observability::metrics;
use crate::places::PlacesClient;

pub const LIVENESS: &str = "liveness";

/// Runs every probe on demand and combines the results.
pub struct HealthAggregator<S = SystemSampler> {
    client: PlacesClient,
    probe_query: String,
    max_cpu_load_percent: f64,
    min_disk_free_percent: f64,
    disk_path: PathBuf,
    sampler: S,
}

impl HealthAggregator<SystemSampler> {
    pub fn new(client: PlacesClient, config: &GatewayConfig) -> Self {
        Self::with_sampler(client, &config.health, config.upstream.probe_query.clone(), SystemSampler)
    }
}

impl<S: ResourceSampler> HealthAggregator<S> {
    pub fn with_sampler(client: PlacesClient, health: &HealthConfig, probe_query: String, sampler: S) -> Self {
        Self {
            client,
            probe_query,
            max_cpu_load_percent: health.max_cpu_load_percent,
            min_disk_free_percent: health.min_disk_free_percent,
            disk_path: PathBuf::from(&health.disk_path),
            sampler,
        }
    }

    /// The process is running.
    pub fn liveness(&self) -> HealthProbeResult {
        HealthProbeResult::up(LIVENESS)
    }

    pub fn cpu(&self) -> HealthProbeResult {
        resources::evaluate_cpu(
            self.sampler.load_average(),
            self.sampler.logical_cpus(),
            self.max_cpu_load_percent,
        )
    }

    pub fn disk(&self) -> HealthProbeResult {
        let usage = self.sampler.disk_usage(&self.disk_path);
        resources::evaluate_disk(usage.as_ref(), &self.disk_path, self.min_disk_free_percent)
    }

    pub async fn upstream(&self) -> HealthProbeResult {
        upstream::probe_upstream(&self.client, &self.probe_query).await
    }

    /// Liveness, resource probes and upstream reachability, combined.
    pub async fn readiness(&self) -> HealthVerdict {
        let components = [self.liveness(), self.cpu(), self.disk(), self.upstream().await];
        for component in &components {
            metrics::record_health_component(component.name, component.is_up());
        }

        let verdict = HealthVerdict::from_components(components);
        if !verdict.is_ok() {
            let failing: Vec<_> = verdict
                .components
                .values()
                .filter(|c| !c.is_up())
                .map(|c| c.name)
                .collect();
            tracing::warn!(failing = ?failing, "Readiness check failed");
        }
        verdict
    }
}
