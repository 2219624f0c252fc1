//! Export boundary: what a packaging collaborator may read.

use serde::Serialize;

use super::types::ItemId;
use crate::artifact::ArtifactHandle;
use crate::pipeline::OutputFormat;

/// A finished item ready to be copied or packaged.
///
/// The handle is only valid while the item stays `done`; a removal or a new
/// run retires it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub item_id: ItemId,
    /// Original file name with the extension of the output format.
    pub file_name: String,
    pub artifact: ArtifactHandle,
    pub format: OutputFormat,
    pub size_bytes: u64,
}

/// Replaces the extension of `original` with the one of `format`.
pub fn export_file_name(original: &str, format: OutputFormat) -> String {
    let stem = match original.rfind('.') {
        Some(idx) if idx > 0 => &original[..idx],
        _ => original,
    };
    format!("{}.{}", stem, format.extension())
}
