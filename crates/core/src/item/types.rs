//! Item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::artifact::ArtifactHandle;
use crate::pipeline::{ImageBytes, OutputFormat};

/// Opaque item identifier, assigned at ingestion and never reused.
pub type ItemId = String;

/// Processing status of an item.
///
/// ```text
/// idle -> pending -> processing -> done | error
/// done | error -> pending            (next run)
/// pending | processing -> idle       (cancellation, staleness)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Idle,
    Pending,
    Processing,
    Done,
    Error,
}

impl ItemStatus {
    /// Whether a run currently has a claim on the item.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ItemStatus::Pending | ItemStatus::Processing)
    }

    /// Whether the item reached a run outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Idle => "idle",
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Done => "done",
            ItemStatus::Error => "error",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Most recent successful transformation output of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedArtifact {
    pub handle: ArtifactHandle,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    /// User-facing preview link, when the host configures one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// One user-supplied image through its lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct ImageItem {
    pub id: ItemId,
    pub file_name: String,
    /// Source bytes; immutable for the lifetime of the item.
    #[serde(skip)]
    pub original: ImageBytes,
    pub original_size_bytes: u64,
    pub processed: Option<ProcessedArtifact>,
    pub status: ItemStatus,
    /// Present only when `status` is `error`.
    pub error: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// An image to ingest.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub data: ImageBytes,
}

impl NewImage {
    pub fn new(file_name: impl Into<String>, data: impl Into<ImageBytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Partial update to an item.
///
/// `processed` and `error` use a double option: `None` leaves the field
/// alone, `Some(None)` clears it.
#[derive(Debug, Default)]
pub struct ItemPatch {
    pub status: Option<ItemStatus>,
    pub processed: Option<Option<ProcessedArtifact>>,
    pub error: Option<Option<String>>,
}

impl ItemPatch {
    /// Queued for a run; clears previous output and error.
    pub fn pending() -> Self {
        Self {
            status: Some(ItemStatus::Pending),
            processed: Some(None),
            error: Some(None),
        }
    }

    /// Claimed by a worker.
    pub fn processing() -> Self {
        Self {
            status: Some(ItemStatus::Processing),
            ..Default::default()
        }
    }

    /// Back to rest without output.
    pub fn idle() -> Self {
        Self {
            status: Some(ItemStatus::Idle),
            processed: Some(None),
            error: Some(None),
        }
    }

    /// Successful transformation.
    pub fn done(artifact: ProcessedArtifact) -> Self {
        Self {
            status: Some(ItemStatus::Done),
            processed: Some(Some(artifact)),
            error: Some(None),
        }
    }

    /// Failed transformation.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ItemStatus::Error),
            processed: Some(None),
            error: Some(Some(message.into())),
        }
    }

    /// Removes the artifact carried by this patch, if any.
    pub(crate) fn take_artifact(&mut self) -> Option<ProcessedArtifact> {
        self.processed.as_mut().and_then(Option::take)
    }
}

/// Number of items per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub idle: usize,
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

impl StatusCounts {
    pub(crate) fn add(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Idle => self.idle += 1,
            ItemStatus::Pending => self.pending += 1,
            ItemStatus::Processing => self.processing += 1,
            ItemStatus::Done => self.done += 1,
            ItemStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.idle + self.pending + self.processing + self.done + self.error
    }

    pub fn in_flight(&self) -> usize {
        self.pending + self.processing
    }
}
