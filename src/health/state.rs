//! Probe results and the aggregate verdict.
//!
//! Every value here is produced fresh per health check and never cached.

use std::collections::BTreeMap;

use serde::Serialize;

/// Status of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthProbeResult {
    #[serde(skip)]
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(rename = "details", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthProbeResult {
    pub fn up(name: &'static str) -> Self {
        Self {
            name,
            status: HealthStatus::Up,
            detail: None,
        }
    }

    pub fn down(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: HealthStatus::Down,
            detail: Some(detail.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// Overall readiness status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Ok,
    Error,
}

/// Aggregate of every probe, keyed by probe name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    pub status: VerdictStatus,
    pub components: BTreeMap<&'static str, HealthProbeResult>,
}

impl HealthVerdict {
    /// `ok` only when every component is UP.
    pub fn from_components(components: impl IntoIterator<Item = HealthProbeResult>) -> Self {
        let components: BTreeMap<_, _> = components.into_iter().map(|c| (c.name, c)).collect();
        let status = if components.values().all(HealthProbeResult::is_up) {
            VerdictStatus::Ok
        } else {
            VerdictStatus::Error
        };
        Self { status, components }
    }

    pub fn is_ok(&self) -> bool {
        self.status == VerdictStatus::Ok
    }
}
