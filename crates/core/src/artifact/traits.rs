//! Release collaborator trait.

use super::types::ArtifactHandle;

/// Deletes artifacts that are no longer referenced by any item.
///
/// Implementations swallow their own failures (logging them at most). A
/// release must never block the caller for long and never panics.
pub trait ArtifactReleaser: Send + Sync {
    /// Releases a single artifact.
    fn release(&self, handle: &ArtifactHandle);

    /// Releases a batch of artifacts.
    fn release_all(&self, handles: &[ArtifactHandle]) {
        for handle in handles {
            self.release(handle);
        }
    }
}
