//! Temporary-file backed artifact store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::error::ArtifactError;
use super::traits::ArtifactReleaser;
use super::types::ArtifactHandle;
use crate::metrics::{ARTIFACTS_RELEASED, ARTIFACT_RELEASE_FAILURES};

/// Allocates, tracks and deletes artifact files in one directory.
///
/// Only files this store produced are ever served or deleted; a handle that
/// points elsewhere is rejected by [`TempArtifactStore::read`] and ignored by
/// [`ArtifactReleaser::release`].
#[derive(Debug)]
pub struct TempArtifactStore {
    dir: PathBuf,
    counter: AtomicU64,
    tracked: Mutex<HashSet<PathBuf>>,
}

impl TempArtifactStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
            tracked: Mutex::new(HashSet::new()),
        })
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns a fresh, unique path with the given extension.
    ///
    /// The path is not tracked until [`TempArtifactStore::register`] is called.
    pub fn allocate(&self, extension: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let pid = std::process::id();
        self.dir.join(format!("{pid}-{n}.{extension}"))
    }

    /// Starts tracking a written file and returns its handle.
    pub fn register(&self, path: PathBuf) -> ArtifactHandle {
        let handle = ArtifactHandle::new(path.clone());
        self.lock().insert(path);
        handle
    }

    /// Whether the handle refers to a live artifact of this store.
    pub fn is_tracked(&self, handle: &ArtifactHandle) -> bool {
        self.lock().contains(handle.path())
    }

    /// Number of live artifacts.
    pub fn tracked_count(&self) -> usize {
        self.lock().len()
    }

    /// Reads the bytes of a tracked artifact.
    pub async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, ArtifactError> {
        if !self.is_tracked(handle) {
            return Err(ArtifactError::NotTracked {
                path: handle.path().to_path_buf(),
            });
        }
        Ok(tokio::fs::read(handle.path()).await?)
    }

    /// Deletes every tracked artifact and the directory itself if empty.
    pub fn cleanup_all(&self) -> usize {
        let paths: Vec<PathBuf> = self.lock().drain().collect();
        let count = paths.len();
        for path in paths {
            remove_file_logged(&path);
        }
        // Only succeeds when nothing else lives in the directory.
        let _ = std::fs::remove_dir(&self.dir);
        debug!(count, dir = %self.dir.display(), "Cleaned up temporary artifacts");
        count
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactReleaser for TempArtifactStore {
    /// Untracks the artifact at once. Inside a tokio runtime the file is
    /// deleted on the blocking pool, otherwise inline.
    fn release(&self, handle: &ArtifactHandle) {
        if !self.lock().remove(handle.path()) {
            debug!(artifact = %handle, "Ignoring release of untracked artifact");
            return;
        }

        let path = handle.path().to_path_buf();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || remove_file_logged(&path));
            }
            Err(_) => remove_file_logged(&path),
        }
    }
}

fn remove_file_logged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => ARTIFACTS_RELEASED.inc(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ARTIFACTS_RELEASED.inc(),
        Err(e) => {
            ARTIFACT_RELEASE_FAILURES.inc();
            warn!("Failed to delete artifact {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, TempArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = TempArtifactStore::new(dir.path().join("artifacts")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_allocate_is_unique() {
        let (_dir, store) = store();
        let a = store.allocate("png");
        let b = store.allocate("png");
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("png"));
        assert!(a.starts_with(store.dir()));
    }

    async fn wait_until_removed(path: &Path) -> bool {
        for _ in 0..100 {
            if !path.exists() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_register_read_release() {
        let (_dir, store) = store();
        let path = store.allocate("jpg");
        std::fs::write(&path, b"bytes").unwrap();
        let handle = store.register(path.clone());

        assert!(store.is_tracked(&handle));
        assert_eq!(store.read(&handle).await.unwrap(), b"bytes");

        store.release(&handle);
        assert!(!store.is_tracked(&handle));
        // Untracked at once, so it can no longer be served.
        assert!(matches!(
            store.read(&handle).await,
            Err(ArtifactError::NotTracked { .. })
        ));
        assert!(wait_until_removed(&path).await);
    }

    #[test]
    fn test_release_outside_runtime_deletes_inline() {
        let (_dir, store) = store();
        let path = store.allocate("png");
        std::fs::write(&path, b"x").unwrap();
        let handle = store.register(path.clone());

        store.release(&handle);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_untracked_is_rejected() {
        let (dir, store) = store();
        let outside = dir.path().join("outside.png");
        std::fs::write(&outside, b"x").unwrap();

        let result = store.read(&ArtifactHandle::new(outside.clone())).await;
        assert!(matches!(result, Err(ArtifactError::NotTracked { .. })));

        // Releasing an untracked handle never deletes foreign files.
        store.release(&ArtifactHandle::new(outside.clone()));
        assert!(outside.exists());
    }

    #[test]
    fn test_release_is_idempotent() {
        let (_dir, store) = store();
        let path = store.allocate("webp");
        std::fs::write(&path, b"x").unwrap();
        let handle = store.register(path);

        store.release(&handle);
        store.release(&handle);
        assert_eq!(store.tracked_count(), 0);
    }

    #[test]
    fn test_cleanup_all() {
        let (_dir, store) = store();
        for _ in 0..3 {
            let path = store.allocate("png");
            std::fs::write(&path, b"x").unwrap();
            store.register(path);
        }
        assert_eq!(store.tracked_count(), 3);
        assert_eq!(store.cleanup_all(), 3);
        assert_eq!(store.tracked_count(), 0);
        assert!(!store.dir().exists());
    }
}
