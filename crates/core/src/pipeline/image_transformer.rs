//! Transformer backed by the `image` crate.

use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use super::error::TransformError;
use super::traits::{TransformOutput, Transformer};
use super::types::{ImageBytes, OutputFormat, PipelineConfiguration};
use crate::artifact::TempArtifactStore;

/// Decode, resize and re-encode into a tracked temporary file.
///
/// Re-encoding from decoded pixels never carries source metadata over, so
/// metadata stripping is implicit. Background removal needs a segmentation
/// model this transformer does not ship; requesting it fails the item.
pub struct ImageTransformer {
    artifacts: Arc<TempArtifactStore>,
}

impl ImageTransformer {
    /// Creates a transformer writing into the given artifact store.
    pub fn new(artifacts: Arc<TempArtifactStore>) -> Self {
        Self { artifacts }
    }

    fn run(
        artifacts: &TempArtifactStore,
        image: &[u8],
        config: &PipelineConfiguration,
    ) -> Result<TransformOutput, TransformError> {
        if config.remove_background {
            return Err(TransformError::unsupported("background removal"));
        }

        let img =
            image::load_from_memory(image).map_err(|e| TransformError::decode(e.to_string()))?;

        let img = match config.active_resize() {
            Some(target) => {
                let (w, h) = img.dimensions();
                match target.fit(w, h) {
                    Some((nw, nh)) => img.resize_exact(nw, nh, FilterType::Lanczos3),
                    None => img,
                }
            }
            None => img,
        };

        let format = config.effective_format();
        let path = artifacts.allocate(format.extension());
        if let Err(e) = encode(&img, format, config.clamped_quality(), &path) {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let (width, height) = img.dimensions();
        let artifact = artifacts.register(path);

        debug!(artifact = %artifact, width, height, size_bytes, "Encoded artifact");

        Ok(TransformOutput {
            artifact,
            width,
            height,
            size_bytes,
        })
    }
}

fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
    path: &Path,
) -> Result<(), TransformError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encode_err = |e: image::ImageError| TransformError::encode(format.to_string(), e.to_string());

    match format {
        OutputFormat::Png => img
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(encode_err),
        OutputFormat::Webp => img
            .write_to(&mut writer, ImageFormat::WebP)
            .map_err(encode_err),
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            encoder.encode_image(&rgb).map_err(encode_err)
        }
    }
}

#[async_trait]
impl Transformer for ImageTransformer {
    fn name(&self) -> &str {
        "image"
    }

    async fn transform(
        &self,
        image: ImageBytes,
        config: &PipelineConfiguration,
    ) -> Result<TransformOutput, TransformError> {
        let artifacts = Arc::clone(&self.artifacts);
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::run(&artifacts, &image, &config))
            .await
            .map_err(|e| TransformError::TaskFailed {
                reason: e.to_string(),
            })?
    }
}
