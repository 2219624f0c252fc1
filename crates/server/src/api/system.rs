//! Host resource API handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use pixbatch_core::SystemSnapshot;

use crate::state::AppState;

/// Latest host reading and the worker count it implies
#[derive(Debug, Serialize)]
pub struct SystemResponse {
    pub snapshot: SystemSnapshot,
    pub recommended_concurrency: usize,
    /// False until the first successful sample.
    pub sampled: bool,
    pub polling: bool,
}

pub async fn get_system(State(state): State<Arc<AppState>>) -> Json<SystemResponse> {
    let sampler = state.sampler();
    let snapshot = sampler.latest();
    Json(SystemResponse {
        recommended_concurrency: snapshot.recommended_concurrency(),
        snapshot,
        sampled: sampler.has_sample(),
        polling: sampler.is_polling(),
    })
}
