//! Selection API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use pixbatch_core::ItemId;

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

/// Current selection
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected: Vec<ItemId>,
}

/// Result of a toggle
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: ItemId,
    pub selected: bool,
}

pub async fn get_selection(State(state): State<Arc<AppState>>) -> Json<SelectionResponse> {
    Json(SelectionResponse {
        selected: state.store().selected_ids(),
    })
}

pub async fn toggle_select(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, (StatusCode, Json<ErrorResponse>)> {
    let store = state.store();
    if store.get(&id).is_none() {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Item not found: {}", id),
        ));
    }

    let selected = store.toggle_select(&id);
    Ok(Json(ToggleResponse { id, selected }))
}

pub async fn select_all(State(state): State<Arc<AppState>>) -> Json<SelectionResponse> {
    state.store().select_all();
    get_selection(State(state)).await
}

pub async fn select_none(State(state): State<Arc<AppState>>) -> Json<SelectionResponse> {
    state.store().select_none();
    get_selection(State(state)).await
}
