//! Host resource probes.
//!
//! Sampling is behind [`ResourceSampler`] so thresholds can be evaluated
//! against fixed readings. No probe here touches the network.

use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};

use crate::health::state::HealthProbeResult;

pub const CPU: &str = "cpu";
pub const DISK: &str = "disk";

/// Space on the filesystem holding a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub available: u64,
    pub total: u64,
}

impl DiskUsage {
    pub fn free_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.available as f64 / self.total as f64 * 100.0
    }
}

/// Source of host resource readings.
pub trait ResourceSampler: Send + Sync {
    /// 1-minute load average; 0 where the platform has none.
    fn load_average(&self) -> f64;

    fn logical_cpus(&self) -> usize;

    /// Usage of the filesystem with the longest mount point containing `path`.
    fn disk_usage(&self, path: &Path) -> Option<DiskUsage>;
}

/// Reads the live host through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSampler;

impl ResourceSampler for SystemSampler {
    fn load_average(&self) -> f64 {
        System::load_average().one
    }

    fn logical_cpus(&self) -> usize {
        std::thread::available_parallelism().map(usize::from).unwrap_or(1)
    }

    fn disk_usage(&self, path: &Path) -> Option<DiskUsage> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .map(|disk| DiskUsage {
                mount_point: disk.mount_point().to_path_buf(),
                available: disk.available_space(),
                total: disk.total_space(),
            })
    }
}

/// Load per logical CPU, in percent, against `max_percent`.
pub fn evaluate_cpu(load_average: f64, logical_cpus: usize, max_percent: f64) -> HealthProbeResult {
    let load_percent = load_average / logical_cpus.max(1) as f64 * 100.0;
    let detail = format!("load {:.1}% across {} cpus", load_percent, logical_cpus);
    if load_percent > max_percent {
        return HealthProbeResult::down(CPU, format!("{}, maximum is {:.1}%", detail, max_percent));
    }
    HealthProbeResult::up(CPU).with_detail(detail)
}

/// Free space against `min_free_percent`.
pub fn evaluate_disk(usage: Option<&DiskUsage>, path: &Path, min_free_percent: f64) -> HealthProbeResult {
    let Some(usage) = usage else {
        return HealthProbeResult::down(DISK, format!("no filesystem found for {}", path.display()));
    };

    let free = usage.free_percent();
    let detail = format!("{:.1}% free on {}", free, usage.mount_point.display());
    if free < min_free_percent {
        return HealthProbeResult::down(DISK, format!("{}, minimum is {:.1}%", detail, min_free_percent));
    }
    HealthProbeResult::up(DISK).with_detail(detail)
}
