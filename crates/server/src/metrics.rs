//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the pixbatch server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Item counts by status (collected dynamically)
//! - Core metrics (runs, workers, transforms, sampler, artifacts)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::error;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pixbatch_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pixbatch_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pixbatch_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pixbatch_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pixbatch_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by event type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pixbatch_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pixbatch_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Item Metrics (collected dynamically)
// =============================================================================

/// Items by current status.
pub static ITEMS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("pixbatch_items_by_status", "Current item count by status"),
        &["status"],
    )
    .unwrap()
});

/// Whether a run is in progress (1) or not (0).
pub static RUN_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("pixbatch_run_busy", "Whether a processing run is in progress").unwrap()
});

/// Temporary artifacts currently on disk.
pub static ARTIFACTS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pixbatch_artifacts_tracked",
        "Number of temporary artifacts currently on disk",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let local: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // WebSocket
        Box::new(WS_CONNECTIONS_ACTIVE.clone()),
        Box::new(WS_CONNECTIONS_TOTAL.clone()),
        Box::new(WS_MESSAGES_SENT.clone()),
        Box::new(WS_LAG_EVENTS.clone()),
        // Items
        Box::new(ITEMS_BY_STATUS.clone()),
        Box::new(RUN_BUSY.clone()),
        Box::new(ARTIFACTS_TRACKED.clone()),
    ];

    // Core metrics (orchestrator, transformer, sampler, artifacts)
    for metric in local.into_iter().chain(pixbatch_core::metrics::all_metrics()) {
        if let Err(e) = registry.register(metric) {
            error!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the item store and the orchestrator.
pub fn collect_dynamic_metrics(state: &AppState) {
    let counts = state.store().status_counts();
    for (status, count) in [
        ("idle", counts.idle),
        ("pending", counts.pending),
        ("processing", counts.processing),
        ("done", counts.done),
        ("error", counts.error),
    ] {
        ITEMS_BY_STATUS
            .with_label_values(&[status])
            .set(count as i64);
    }

    RUN_BUSY.set(i64::from(state.orchestrator().is_busy()));
    ARTIFACTS_TRACKED.set(state.artifacts().tracked_count() as i64);
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = NUMERIC_RE.replace_all(&result, "/{id}$1");
    result.to_string()
}
