//! Mock metrics source for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::sampler::{MetricsSource, SampleError, SystemSnapshot};

/// Mock implementation of the MetricsSource trait.
///
/// Scripted results are consumed in order; once the script is empty the
/// default sample (if any) is returned forever.
#[derive(Debug, Default)]
pub struct MockMetricsSource {
    script: Mutex<VecDeque<Result<SystemSnapshot, SampleError>>>,
    default_sample: Mutex<Option<SystemSnapshot>>,
    samples: AtomicUsize,
}

impl MockMetricsSource {
    /// Create a new mock source with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful sample.
    pub fn push_sample(&self, core_count: usize, cpu_utilization_percent: f32) {
        self.lock_script()
            .push_back(Ok(snapshot(core_count, cpu_utilization_percent)));
    }

    /// Queue a failed sample.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.lock_script()
            .push_back(Err(SampleError::Unavailable(reason.into())));
    }

    /// Sample returned once the script runs dry.
    pub fn set_default_sample(&self, core_count: usize, cpu_utilization_percent: f32) {
        *self
            .default_sample
            .lock()
            .unwrap_or_else(PoisonError::into_inner) =
            Some(snapshot(core_count, cpu_utilization_percent));
    }

    /// Number of times the source was queried.
    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    fn lock_script(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<Result<SystemSnapshot, SampleError>>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn snapshot(core_count: usize, cpu_utilization_percent: f32) -> SystemSnapshot {
    SystemSnapshot {
        core_count,
        cpu_utilization_percent,
        memory_total_mb: 16 * 1024,
        memory_used_mb: 4 * 1024,
        sampled_at: Utc::now(),
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn sample_system_info(&self) -> Result<SystemSnapshot, SampleError> {
        self.samples.fetch_add(1, Ordering::SeqCst);

        if let Some(scripted) = self.lock_script().pop_front() {
            return scripted;
        }

        self.default_sample
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SampleError::Unavailable("no sample configured".to_string()))
    }
}
