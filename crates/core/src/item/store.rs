//! In-memory item store.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use super::events::StoreEvent;
use super::export::{export_file_name, ExportEntry};
use super::types::{ImageItem, ItemId, ItemPatch, ItemStatus, NewImage, StatusCounts};
use crate::artifact::{ArtifactHandle, ArtifactReleaser};
use crate::metadata::{read_metadata, ImageMetadata};
use crate::pipeline::{PipelineConfigPatch, PipelineConfiguration};

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 1024;

/// Result of a conditional update.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// The patch was applied; carries the updated item.
    Applied(ImageItem),
    /// The predicate said the caller's view is stale; nothing changed.
    Rejected,
    /// No item with that id exists any more.
    Missing,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    items: Vec<ImageItem>,
    selected: HashSet<ItemId>,
    pipeline: PipelineConfiguration,
}

impl StoreState {
    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn selected_in_order(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| self.selected.contains(&item.id))
            .map(|item| item.id.clone())
            .collect()
    }
}

/// Applies a patch, returning the artifact it displaced (if any).
fn apply_patch(item: &mut ImageItem, patch: ItemPatch) -> Option<ArtifactHandle> {
    let mut displaced = None;
    if let Some(processed) = patch.processed {
        let old = std::mem::replace(&mut item.processed, processed);
        if let Some(old) = old {
            let same = item
                .processed
                .as_ref()
                .is_some_and(|new| new.handle == old.handle);
            if !same {
                displaced = Some(old.handle);
            }
        }
    }
    if let Some(status) = patch.status {
        item.status = status;
    }
    if let Some(error) = patch.error {
        item.error = error;
    }
    if item.status != ItemStatus::Error {
        item.error = None;
    }
    displaced
}

/// Authoritative, ordered collection of items plus selection and live
/// pipeline configuration.
///
/// The store owns every processed artifact it references. Whenever it drops
/// one (replacement, reset, removal, clear, or a rejected commit carrying a
/// fresh artifact) it hands the handle to the release collaborator, after the
/// write lock has been released.
pub struct ItemStore {
    state: RwLock<StoreState>,
    releaser: Arc<dyn ArtifactReleaser>,
    events: broadcast::Sender<StoreEvent>,
}

impl ItemStore {
    /// Creates an empty store with the default pipeline configuration.
    pub fn new(releaser: Arc<dyn ArtifactReleaser>) -> Self {
        Self::with_pipeline(releaser, PipelineConfiguration::default())
    }

    /// Creates an empty store with an initial pipeline configuration.
    pub fn with_pipeline(
        releaser: Arc<dyn ArtifactReleaser>,
        pipeline: PipelineConfiguration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(StoreState {
                pipeline,
                ..Default::default()
            }),
            releaser,
            events,
        }
    }

    /// Subscribes to store events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn release(&self, handles: Vec<ArtifactHandle>) {
        if !handles.is_empty() {
            debug!(count = handles.len(), "Releasing displaced artifacts");
            self.releaser.release_all(&handles);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Snapshot of all items in insertion order.
    pub fn items(&self) -> Vec<ImageItem> {
        self.read().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<ImageItem> {
        let state = self.read();
        state.position(id).map(|idx| state.items[idx].clone())
    }

    /// EXIF fields of the item's source bytes, or `None` for an unknown id.
    ///
    /// Parsing happens after the read lock is dropped.
    pub fn item_metadata(&self, id: &str) -> Option<ImageMetadata> {
        let original = {
            let state = self.read();
            state.position(id).map(|idx| Arc::clone(&state.items[idx].original))
        }?;
        Some(read_metadata(&original))
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Selected ids, in item order.
    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.read().selected_in_order()
    }

    /// Ids a run would process: the selection, or every item when nothing
    /// is selected.
    pub fn target_ids(&self) -> Vec<ItemId> {
        let state = self.read();
        if state.selected.is_empty() {
            state.items.iter().map(|item| item.id.clone()).collect()
        } else {
            state.selected_in_order()
        }
    }

    /// Copy of the live pipeline configuration.
    pub fn pipeline_configuration(&self) -> PipelineConfiguration {
        self.read().pipeline.clone()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let state = self.read();
        let mut counts = StatusCounts::default();
        for item in &state.items {
            counts.add(item.status);
        }
        counts
    }

    /// Every `done` item with a live artifact, in item order.
    pub fn export_entries(&self) -> Vec<ExportEntry> {
        self.read()
            .items
            .iter()
            .filter(|item| item.status == ItemStatus::Done)
            .filter_map(|item| {
                item.processed.as_ref().map(|processed| ExportEntry {
                    item_id: item.id.clone(),
                    file_name: export_file_name(&item.file_name, processed.format),
                    artifact: processed.handle.clone(),
                    format: processed.format,
                    size_bytes: processed.size_bytes,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Ingests images as `idle` items and returns their new ids.
    pub fn add_items(&self, images: Vec<NewImage>) -> Vec<ItemId> {
        if images.is_empty() {
            return Vec::new();
        }
        let now = Utc::now();
        let mut state = self.write();
        let ids: Vec<ItemId> = images
            .into_iter()
            .map(|image| {
                let id = uuid::Uuid::new_v4().to_string();
                state.items.push(ImageItem {
                    id: id.clone(),
                    file_name: image.file_name,
                    original_size_bytes: image.data.len() as u64,
                    original: image.data,
                    processed: None,
                    status: ItemStatus::Idle,
                    error: None,
                    added_at: now,
                });
                id
            })
            .collect();
        self.publish(StoreEvent::ItemsAdded { ids: ids.clone() });
        ids
    }

    /// Applies a patch. Unknown ids are a no-op; an artifact carried by the
    /// patch is then released.
    pub fn update_item(&self, id: &str, patch: ItemPatch) -> Option<ImageItem> {
        match self.update_item_if(id, patch, || true) {
            UpdateOutcome::Applied(item) => Some(item),
            _ => None,
        }
    }

    /// Applies a patch only if `still_current` holds.
    ///
    /// The predicate is evaluated under the write lock, so no other mutation
    /// can slip in between the check and the write. When the patch is not
    /// applied, any artifact it carries is released.
    pub fn update_item_if<F>(&self, id: &str, mut patch: ItemPatch, still_current: F) -> UpdateOutcome
    where
        F: FnOnce() -> bool,
    {
        let (outcome, released) = {
            let mut state = self.write();
            match state.position(id) {
                None => (
                    UpdateOutcome::Missing,
                    patch.take_artifact().map(|a| a.handle),
                ),
                Some(_) if !still_current() => (
                    UpdateOutcome::Rejected,
                    patch.take_artifact().map(|a| a.handle),
                ),
                Some(idx) => {
                    let item = &mut state.items[idx];
                    let displaced = apply_patch(item, patch);
                    let snapshot = item.clone();
                    self.publish(StoreEvent::ItemUpdated {
                        item: snapshot.clone(),
                    });
                    (UpdateOutcome::Applied(snapshot), displaced)
                }
            }
        };
        self.release(released.into_iter().collect());
        outcome
    }

    /// Atomically marks the given items `pending`, dropping previous output
    /// and errors. Returns snapshots of the items that exist, in the order
    /// requested.
    pub fn mark_pending(&self, ids: &[ItemId]) -> Vec<ImageItem> {
        let mut displaced = Vec::new();
        let mut marked = Vec::with_capacity(ids.len());
        {
            let mut state = self.write();
            for id in ids {
                if let Some(idx) = state.position(id) {
                    let item = &mut state.items[idx];
                    displaced.extend(apply_patch(item, ItemPatch::pending()));
                    let snapshot = item.clone();
                    self.publish(StoreEvent::ItemUpdated {
                        item: snapshot.clone(),
                    });
                    marked.push(snapshot);
                }
            }
        }
        self.release(displaced);
        marked
    }

    /// Puts every `pending`/`processing` item back to `idle`, releasing any
    /// artifact it still references. Returns the ids that were reset.
    pub fn reset_in_flight(&self) -> Vec<ItemId> {
        let mut displaced = Vec::new();
        let mut reset = Vec::new();
        {
            let mut state = self.write();
            for item in state.items.iter_mut().filter(|item| item.status.is_in_flight()) {
                displaced.extend(apply_patch(item, ItemPatch::idle()));
                reset.push(item.id.clone());
                self.publish(StoreEvent::ItemUpdated { item: item.clone() });
            }
        }
        self.release(displaced);
        reset
    }

    /// Removes an item and its artifact. Returns whether it existed.
    pub fn remove_item(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.write();
            let Some(idx) = state.position(id) else {
                return false;
            };
            let item = state.items.remove(idx);
            let was_selected = state.selected.remove(id);
            self.publish(StoreEvent::ItemRemoved { id: item.id.clone() });
            if was_selected {
                self.publish(StoreEvent::SelectionChanged {
                    selected: state.selected_in_order(),
                });
            }
            item
        };
        self.release(removed.processed.map(|p| p.handle).into_iter().collect());
        true
    }

    /// Removes every item, releasing all artifacts. Returns the number of
    /// items removed.
    pub fn clear_all(&self) -> usize {
        let items = {
            let mut state = self.write();
            state.selected.clear();
            let items = std::mem::take(&mut state.items);
            self.publish(StoreEvent::Cleared { count: items.len() });
            items
        };
        let count = items.len();
        self.release(
            items
                .into_iter()
                .filter_map(|item| item.processed.map(|p| p.handle))
                .collect(),
        );
        count
    }

    /// Toggles selection of an item; unknown ids are ignored. Returns whether
    /// the item is selected afterwards.
    pub fn toggle_select(&self, id: &str) -> bool {
        let mut state = self.write();
        if state.position(id).is_none() {
            return false;
        }
        let selected = if state.selected.remove(id) {
            false
        } else {
            state.selected.insert(id.to_string());
            true
        };
        self.publish(StoreEvent::SelectionChanged {
            selected: state.selected_in_order(),
        });
        selected
    }

    pub fn select_all(&self) {
        let mut state = self.write();
        state.selected = state.items.iter().map(|item| item.id.clone()).collect();
        self.publish(StoreEvent::SelectionChanged {
            selected: state.selected_in_order(),
        });
    }

    pub fn select_none(&self) {
        let mut state = self.write();
        state.selected.clear();
        self.publish(StoreEvent::SelectionChanged {
            selected: Vec::new(),
        });
    }

    /// Merges a patch into the live pipeline configuration.
    ///
    /// Runs already in flight hold their own snapshot and are unaffected.
    pub fn set_pipeline_configuration(&self, patch: &PipelineConfigPatch) -> PipelineConfiguration {
        let mut state = self.write();
        state.pipeline.apply(patch);
        let pipeline = state.pipeline.clone();
        self.publish(StoreEvent::PipelineChanged {
            pipeline: pipeline.clone(),
        });
        pipeline
    }
}
