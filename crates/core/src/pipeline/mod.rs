//! Image transformation pipeline seam.
//!
//! The orchestrator treats a transformation as one opaque, potentially slow
//! call per image: `transform(bytes, configuration)`. This module defines that
//! seam ([`Transformer`]), the immutable [`PipelineConfiguration`] snapshot
//! passed to it, and a default [`ImageTransformer`] built on the `image` crate.

mod error;
mod image_transformer;
mod traits;
mod types;

pub use error::{normalize_failure_message, TransformError};
pub use image_transformer::ImageTransformer;
pub use traits::{TransformOutput, Transformer};
pub use types::{ImageBytes, OutputFormat, PipelineConfigPatch, PipelineConfiguration, ResizeTarget};
