//! Item API handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use pixbatch_core::{export_file_name, ArtifactError, ImageItem, ImageMetadata, ItemId, NewImage};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// An item as listed by the API.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    #[serde(flatten)]
    pub item: ImageItem,
    pub selected: bool,
}

/// Response for listing items
#[derive(Debug, Serialize)]
pub struct ListItemsResponse {
    pub items: Vec<ItemResponse>,
    pub total: usize,
}

/// Response for an upload
#[derive(Debug, Serialize)]
pub struct AddItemsResponse {
    pub ids: Vec<ItemId>,
}

/// Response for removals
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Handlers
// ============================================================================

/// List every item in insertion order
pub async fn list_items(State(state): State<Arc<AppState>>) -> Json<ListItemsResponse> {
    let store = state.store();
    let selected = store.selected_ids();
    let items: Vec<ItemResponse> = store
        .items()
        .into_iter()
        .map(|item| ItemResponse {
            selected: selected.contains(&item.id),
            item,
        })
        .collect();

    Json(ListItemsResponse {
        total: items.len(),
        items,
    })
}

/// Add images from a multipart upload; every file part becomes one item
pub async fn add_items(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AddItemsResponse>), ApiError> {
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            debug!("Skipping multipart field without a file name");
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;

        if data.is_empty() {
            warn!("Skipping empty upload {}", file_name);
            continue;
        }

        images.push(NewImage::new(file_name, data.to_vec()));
    }

    if images.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No image files in upload",
        ));
    }

    let ids = state.store().add_items(images);
    info!("Added {} items", ids.len());

    Ok((StatusCode::CREATED, Json(AddItemsResponse { ids })))
}

/// Remove every item and its artifact
pub async fn clear_items(State(state): State<Arc<AppState>>) -> Json<RemovedResponse> {
    let removed = state.store().clear_all();
    info!("Cleared {} items", removed);
    Json(RemovedResponse { removed })
}

/// Remove one item and its artifact
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RemovedResponse>, ApiError> {
    if state.store().remove_item(&id) {
        Ok(Json(RemovedResponse { removed: 1 }))
    } else {
        Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Item not found: {}", id),
        ))
    }
}

/// Download the processed artifact of an item
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let item = state.store().get(&id).ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, format!("Item not found: {}", id))
    })?;

    let artifact = item.processed.ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Item {} has no processed artifact", id),
        )
    })?;

    let bytes = state
        .artifacts()
        .read(&artifact.handle)
        .await
        .map_err(|e| match e {
            ArtifactError::NotTracked { .. } => {
                error_response(StatusCode::NOT_FOUND, "Artifact is no longer available")
            }
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&item.file_name, artifact.format).replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, artifact.format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// EXIF fields of an item's source image.
pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ImageMetadata>, ApiError> {
    let store = Arc::clone(state.store());
    let lookup = id.clone();
    let metadata = tokio::task::spawn_blocking(move || store.item_metadata(&lookup))
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    metadata
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Item not found: {}", id)))
}
