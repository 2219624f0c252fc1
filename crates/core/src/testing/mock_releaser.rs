//! Mock artifact releaser for testing.

use std::sync::{Mutex, PoisonError};

use crate::artifact::{ArtifactHandle, ArtifactReleaser};

/// Records every released handle instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MockReleaser {
    released: Mutex<Vec<ArtifactHandle>>,
}

impl MockReleaser {
    /// Create a new mock releaser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles released so far, in release order.
    pub fn released(&self) -> Vec<ArtifactHandle> {
        self.lock().clone()
    }

    pub fn release_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether `handle` was released at least once.
    pub fn was_released(&self, handle: &ArtifactHandle) -> bool {
        self.lock().contains(handle)
    }

    /// Forget recorded releases.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ArtifactHandle>> {
        self.released.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactReleaser for MockReleaser {
    fn release(&self, handle: &ArtifactHandle) {
        self.lock().push(handle.clone());
    }
}
