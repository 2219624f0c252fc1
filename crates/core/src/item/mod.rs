//! Authoritative collection of image items and the current selection.
//!
//! The [`ItemStore`] is the single shared mutable resource of the system:
//! the orchestrator and the outer surfaces only change items through its
//! operations. Every mutation is atomic, total (unknown ids are no-ops) and
//! published as a [`StoreEvent`].

mod events;
mod export;
mod store;
mod types;

pub use events::StoreEvent;
pub use export::{export_file_name, ExportEntry};
pub use store::{ItemStore, UpdateOutcome};
pub use types::{ImageItem, ItemId, ItemPatch, ItemStatus, NewImage, ProcessedArtifact, StatusCounts};
