//! Export API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use pixbatch_core::ExportEntry;

use crate::state::AppState;

/// Finished items ready for packaging
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub entries: Vec<ExportEntry>,
    pub total_bytes: u64,
}

pub async fn list_export(State(state): State<Arc<AppState>>) -> Json<ExportResponse> {
    let entries = state.store().export_entries();
    let total_bytes = entries.iter().map(|e| e.size_bytes).sum();
    Json(ExportResponse {
        entries,
        total_bytes,
    })
}
