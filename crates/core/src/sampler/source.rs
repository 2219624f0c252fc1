//! Metrics sources.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sysinfo::System;

use super::types::{SampleError, SystemSnapshot};

/// Raw host metrics provider.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Returns the name of this source.
    fn name(&self) -> &str;

    /// Reads core count, CPU utilisation and memory usage.
    async fn sample_system_info(&self) -> Result<SystemSnapshot, SampleError>;
}

/// Samples the local host through `sysinfo`.
///
/// CPU utilisation needs two readings; the source refreshes, waits for the
/// measurement window and refreshes again on a blocking thread.
pub struct SysinfoSource {
    window: Duration,
}

impl SysinfoSource {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[async_trait]
impl MetricsSource for SysinfoSource {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn sample_system_info(&self) -> Result<SystemSnapshot, SampleError> {
        let window = self.window;
        let snapshot = tokio::task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_cpu_usage();
            std::thread::sleep(window);
            sys.refresh_cpu_usage();
            sys.refresh_memory();

            SystemSnapshot {
                core_count: sys.cpus().len(),
                cpu_utilization_percent: sys.global_cpu_usage(),
                memory_total_mb: sys.total_memory() / (1024 * 1024),
                memory_used_mb: sys.used_memory() / (1024 * 1024),
                sampled_at: Utc::now(),
            }
        })
        .await
        .map_err(|e| SampleError::TaskFailed(e.to_string()))?;

        if snapshot.core_count == 0 {
            return Err(SampleError::Unavailable("no CPUs reported".to_string()));
        }
        Ok(snapshot)
    }
}
