//! Pipeline configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Immutable source pixel bytes, shared cheaply between the store and workers.
pub type ImageBytes = Arc<[u8]>;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// File extension used for artifacts and exported files.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// MIME type of the encoded output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Whether the format can carry an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        };
        f.write_str(name)
    }
}

/// Target dimensions for the resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResizeTarget {
    /// Neither side may exceed `max_px`.
    MaxEdge { max_px: u32 },
    /// Width and height are bounded independently.
    Explicit { width: u32, height: u32 },
}

impl ResizeTarget {
    /// Bounding box `(max_width, max_height)` for this target.
    pub fn bounds(&self) -> (u32, u32) {
        match *self {
            ResizeTarget::MaxEdge { max_px } => (max_px, max_px),
            ResizeTarget::Explicit { width, height } => (width, height),
        }
    }

    /// Dimensions after fitting `(width, height)` into the bounds.
    ///
    /// Aspect ratio is preserved, images are never enlarged, and each side is
    /// at least one pixel. Returns `None` when no resize is necessary.
    pub fn fit(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (max_w, max_h) = self.bounds();
        if width == 0 || height == 0 || max_w == 0 || max_h == 0 {
            return None;
        }
        let ratio = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
        if ratio >= 0.9999 {
            return None;
        }
        let new_w = ((width as f64 * ratio) as u32).max(1);
        let new_h = ((height as f64 * ratio) as u32).max(1);
        Some((new_w, new_h))
    }
}

impl Default for ResizeTarget {
    fn default() -> Self {
        ResizeTarget::MaxEdge { max_px: 1920 }
    }
}

/// User-chosen transformation settings.
///
/// A run captures this by value when it starts; edits made while the run is
/// in flight never reach its workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfiguration {
    #[serde(default = "default_format")]
    pub format: OutputFormat,
    /// Encoder quality, 1-100.
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default)]
    pub resize_enabled: bool,
    #[serde(default)]
    pub resize: ResizeTarget,
    #[serde(default)]
    pub remove_background: bool,
    /// Carried for clients only. [`ImageTransformer`](super::ImageTransformer)
    /// re-encodes from decoded pixels and so always drops metadata, whatever
    /// this flag says.
    #[serde(default)]
    pub strip_metadata: bool,
}

fn default_format() -> OutputFormat {
    OutputFormat::Webp
}

fn default_quality() -> u8 {
    80
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self {
            format: default_format(),
            quality: default_quality(),
            resize_enabled: false,
            resize: ResizeTarget::default(),
            remove_background: false,
            strip_metadata: false,
        }
    }
}

impl PipelineConfiguration {
    /// Format actually written.
    ///
    /// Background removal produces transparency, so a JPEG request is
    /// promoted to PNG when it is enabled.
    pub fn effective_format(&self) -> OutputFormat {
        if self.remove_background && !self.format.supports_alpha() {
            OutputFormat::Png
        } else {
            self.format
        }
    }

    /// Quality clamped into the valid encoder range.
    pub fn clamped_quality(&self) -> u8 {
        self.quality.clamp(1, 100)
    }

    /// Resize target if resizing is enabled.
    pub fn active_resize(&self) -> Option<ResizeTarget> {
        self.resize_enabled.then_some(self.resize)
    }

    /// Applies a partial update, clamping quality into range.
    pub fn apply(&mut self, patch: &PipelineConfigPatch) {
        if let Some(format) = patch.format {
            self.format = format;
        }
        if let Some(quality) = patch.quality {
            self.quality = quality.clamp(1, 100);
        }
        if let Some(enabled) = patch.resize_enabled {
            self.resize_enabled = enabled;
        }
        if let Some(resize) = patch.resize {
            self.resize = resize;
        }
        if let Some(remove) = patch.remove_background {
            self.remove_background = remove;
        }
        if let Some(strip) = patch.strip_metadata {
            self.strip_metadata = strip;
        }
    }
}

/// Partial update to a [`PipelineConfiguration`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_background: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_metadata: Option<bool>,
}

impl PipelineConfigPatch {
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_resize(mut self, resize: ResizeTarget) -> Self {
        self.resize_enabled = Some(true);
        self.resize = Some(resize);
        self
    }

    pub fn with_remove_background(mut self, enabled: bool) -> Self {
        self.remove_background = Some(enabled);
        self
    }

    pub fn with_strip_metadata(mut self, enabled: bool) -> Self {
        self.strip_metadata = Some(enabled);
        self
    }
}
