//! Trait definitions for the pipeline module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::TransformError;
use super::types::{ImageBytes, PipelineConfiguration};
use crate::artifact::ArtifactHandle;

/// Result of one successful transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    /// Handle of the freshly produced artifact. Ownership passes to the caller.
    pub artifact: ArtifactHandle,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// Opaque, single-call image transformation engine.
///
/// Implementations may be slow and may fail; the orchestrator imposes no
/// timeout and expects no internal retries.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Returns the name of this transformer implementation.
    fn name(&self) -> &str;

    /// Transforms one image according to the configuration snapshot.
    async fn transform(
        &self,
        image: ImageBytes,
        config: &PipelineConfiguration,
    ) -> Result<TransformOutput, TransformError>;
}
