//! Error types for the artifact module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when accessing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The handle does not refer to a file produced by this store.
    #[error("artifact is not tracked: {path}")]
    NotTracked { path: PathBuf },

    /// Reading or creating the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
