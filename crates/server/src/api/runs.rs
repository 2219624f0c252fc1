//! Run API handlers.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use pixbatch_core::{ItemId, OrchestratorError, OrchestratorStatus};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Optional request body for starting a run
#[derive(Debug, Default, Deserialize)]
pub struct StartRunBody {
    /// Explicit targets; defaults to the selection, or every item.
    #[serde(default)]
    pub item_ids: Option<Vec<ItemId>>,
}

/// Response for a started run
#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub generation: u64,
}

/// Response for a cancel request
#[derive(Debug, Serialize)]
pub struct CancelRunResponse {
    /// False when no run was active.
    pub cancelled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a run over the selection (or explicit ids) with the live pipeline
/// configuration
pub async fn start_run(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartRunResponse>), (StatusCode, Json<ErrorResponse>)> {
    let body: StartRunBody = if body.is_empty() {
        StartRunBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
        })?
    };

    let orchestrator = state.orchestrator();
    let result = match body.item_ids {
        Some(ids) => {
            orchestrator.start_run(&ids, state.store().pipeline_configuration())
        }
        None => orchestrator.process_selection(),
    };

    let handle = result.map_err(|e| {
        let status = match e {
            OrchestratorError::EmptyTargets => StatusCode::BAD_REQUEST,
            OrchestratorError::RunInProgress { .. } => StatusCode::CONFLICT,
            OrchestratorError::RunTaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, e.to_string())
    })?;

    let generation = handle.generation();
    tokio::spawn(async move {
        match handle.wait().await {
            Ok(summary) => info!(
                "Run {} finished ({}) after {} ms",
                summary.generation,
                summary.outcome,
                (summary.finished_at - summary.started_at).num_milliseconds()
            ),
            Err(e) => error!("Run {} failed: {}", generation, e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(StartRunResponse { generation })))
}

/// Cancel the active run
pub async fn cancel_run(State(state): State<Arc<AppState>>) -> Json<CancelRunResponse> {
    Json(CancelRunResponse {
        cancelled: state.orchestrator().cancel_run(),
    })
}

/// Get orchestrator status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator().status())
}
