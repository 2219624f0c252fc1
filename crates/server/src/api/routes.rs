use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{export, handlers, items, middleware::metrics_middleware, pipeline, runs, selection, system, ws};
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

/// Public link of an item's processed artifact; `{id}` is the item id.
pub const ARTIFACT_URL: &str = "/api/v1/items/{id}/artifact";

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config().server.max_upload_bytes();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Items
        .route(
            "/items",
            get(items::list_items)
                .post(items::add_items)
                .delete(items::clear_items)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/items/{id}", delete(items::remove_item))
        .route("/items/{id}/artifact", get(items::get_artifact))
        .route("/items/{id}/metadata", get(items::get_metadata))
        .route("/items/{id}/select", post(selection::toggle_select))
        // Selection
        .route(
            "/selection",
            get(selection::get_selection).delete(selection::select_none),
        )
        .route("/selection/all", post(selection::select_all))
        // Pipeline configuration
        .route(
            "/pipeline",
            get(pipeline::get_pipeline).patch(pipeline::update_pipeline),
        )
        // Runs
        .route("/runs", post(runs::start_run))
        .route("/runs/current", delete(runs::cancel_run))
        .route("/runs/status", get(runs::get_status))
        // Host resources and export
        .route("/system", get(system::get_system))
        .route("/export", get(export::list_export))
        // Live store events
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route(
            "/metrics",
            get(move || {
                let state = Arc::clone(&state);
                async move {
                    collect_dynamic_metrics(&state);
                    encode_metrics()
                }
            }),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
