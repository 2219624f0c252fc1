//! Temporary artifacts produced by the transformation pipeline.
//!
//! Every successful transformation yields exactly one artifact, identified by
//! an [`ArtifactHandle`]. Whoever holds the handle owns the artifact until it
//! is handed to an [`ArtifactReleaser`]; releasing is best-effort and never
//! blocks or fails the caller.

mod error;
mod temp_store;
mod traits;
mod types;

pub use error::ArtifactError;
pub use temp_store::TempArtifactStore;
pub use traits::ArtifactReleaser;
pub use types::ArtifactHandle;
