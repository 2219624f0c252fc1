//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (runs, items, workers)
//! - Transformer (duration per item)
//! - Resource sampler (CPU load, recommended concurrency)
//! - Artifact release

use once_cell::sync::Lazy;
use prometheus::{
    Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
};

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs started total.
pub static RUNS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pixbatch_runs_started_total", "Total processing runs started").unwrap()
});

/// Runs finished total by outcome.
pub static RUNS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pixbatch_runs_finished_total", "Total processing runs finished"),
        &["outcome"], // "completed", "cancelled", "superseded"
    )
    .unwrap()
});

/// Items finished total by result.
pub static ITEMS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pixbatch_items_finished_total", "Total items that left a worker"),
        &["result"], // "done", "error", "discarded"
    )
    .unwrap()
});

/// Workers currently running.
pub static WORKERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("pixbatch_workers_active", "Number of workers currently running").unwrap()
});

/// Transformation duration in seconds.
pub static TRANSFORM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pixbatch_transform_duration_seconds",
            "Duration of a single image transformation",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Resource sampler
// =============================================================================

/// Last sampled CPU utilisation.
pub static CPU_UTILIZATION: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new("pixbatch_cpu_utilization_percent", "Last sampled CPU utilisation").unwrap()
});

/// Worker count the heuristic currently recommends.
pub static RECOMMENDED_CONCURRENCY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pixbatch_recommended_concurrency",
        "Worker count recommended for the current host load",
    )
    .unwrap()
});

// =============================================================================
// Artifacts
// =============================================================================

/// Artifacts deleted.
pub static ARTIFACTS_RELEASED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pixbatch_artifacts_released_total", "Total artifacts released").unwrap()
});

/// Artifact deletions that failed.
pub static ARTIFACT_RELEASE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pixbatch_artifact_release_failures_total",
        "Total artifact deletions that failed",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(RUNS_STARTED.clone()),
        Box::new(RUNS_FINISHED.clone()),
        Box::new(ITEMS_FINISHED.clone()),
        Box::new(WORKERS_ACTIVE.clone()),
        Box::new(TRANSFORM_DURATION.clone()),
        // Sampler
        Box::new(CPU_UTILIZATION.clone()),
        Box::new(RECOMMENDED_CONCURRENCY.clone()),
        // Artifacts
        Box::new(ARTIFACTS_RELEASED.clone()),
        Box::new(ARTIFACT_RELEASE_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        RUNS_STARTED.inc();
        ITEMS_FINISHED.with_label_values(&["done"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "pixbatch_runs_started_total"));
    }
}
