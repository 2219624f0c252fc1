//! Artifact handle type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable reference to one transformation output.
///
/// Handles are never shared between items. Consumers (export, preview) must
/// not assume the handle stays valid once the owning item leaves `done`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(PathBuf);

impl ArtifactHandle {
    /// Wraps a path as an artifact handle.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Location of the artifact.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File extension of the artifact, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.extension().and_then(|e| e.to_str())
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
