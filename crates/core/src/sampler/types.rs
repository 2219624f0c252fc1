//! Sampler types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a metrics source can report.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The host refused or failed the measurement.
    #[error("system sampling failed: {0}")]
    Unavailable(String),

    /// The blocking sampling task died.
    #[error("sampling task failed: {0}")]
    TaskFailed(String),
}

/// Point-in-time host resource reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub core_count: usize,
    pub cpu_utilization_percent: f32,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub sampled_at: DateTime<Utc>,
}

impl SystemSnapshot {
    /// Reading that assumes an idle host with `core_count` cores.
    pub fn assume_idle(core_count: usize) -> Self {
        Self {
            core_count,
            cpu_utilization_percent: 0.0,
            memory_total_mb: 0,
            memory_used_mb: 0,
            sampled_at: Utc::now(),
        }
    }

    /// Recommended worker count for this reading.
    pub fn recommended_concurrency(&self) -> usize {
        super::heuristic::recommended_concurrency(self.core_count, self.cpu_utilization_percent)
    }
}
