//! Pipeline configuration API handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use pixbatch_core::{PipelineConfigPatch, PipelineConfiguration};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

/// Read the live pipeline configuration
pub async fn get_pipeline(State(state): State<Arc<AppState>>) -> Json<PipelineConfiguration> {
    Json(state.store().pipeline_configuration())
}

/// Merge a partial update into the live pipeline configuration.
///
/// Runs already in progress keep the configuration they started with.
pub async fn update_pipeline(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PipelineConfigPatch>,
) -> Result<Json<PipelineConfiguration>, (StatusCode, Json<ErrorResponse>)> {
    if let Some(quality) = patch.quality {
        if !(1..=100).contains(&quality) {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("quality must be within 1-100, got {}", quality),
            ));
        }
    }
    if let Some(resize) = &patch.resize {
        let (width, height) = resize.bounds();
        if width == 0 || height == 0 {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "resize dimensions cannot be 0",
            ));
        }
    }

    let updated = state.store().set_pipeline_configuration(&patch);
    info!(
        "Pipeline configuration updated: {} q{}",
        updated.effective_format(),
        updated.clamped_quality()
    );
    Ok(Json(updated))
}
