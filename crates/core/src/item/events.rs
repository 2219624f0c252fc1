//! Change notifications published by the item store.

use serde::Serialize;

use super::types::{ImageItem, ItemId};
use crate::pipeline::PipelineConfiguration;

/// A mutation observed on the [`ItemStore`](super::ItemStore).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ItemsAdded { ids: Vec<ItemId> },
    ItemUpdated { item: ImageItem },
    ItemRemoved { id: ItemId },
    Cleared { count: usize },
    SelectionChanged { selected: Vec<ItemId> },
    PipelineChanged { pipeline: PipelineConfiguration },
}

impl StoreEvent {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreEvent::ItemsAdded { .. } => "items_added",
            StoreEvent::ItemUpdated { .. } => "item_updated",
            StoreEvent::ItemRemoved { .. } => "item_removed",
            StoreEvent::Cleared { .. } => "cleared",
            StoreEvent::SelectionChanged { .. } => "selection_changed",
            StoreEvent::PipelineChanged { .. } => "pipeline_changed",
        }
    }
}
