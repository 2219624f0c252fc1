//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the seams around the
//! orchestrator, so runs can be driven deterministically without decoding
//! real images or reading real system load.
//!
//! # Example
//!
//! ```rust,ignore
//! use pixbatch_core::testing::{MockReleaser, MockTransformer};
//!
//! let transformer = MockTransformer::new();
//! transformer.set_delay(Duration::from_millis(50));
//! transformer.fail_on(b"broken".to_vec(), "Error: corrupt header");
//!
//! // Wire into a ProcessingOrchestrator, run, then:
//! assert_eq!(releaser.release_count(), transformer.produced_count() - kept);
//! ```

mod mock_metrics;
mod mock_releaser;
mod mock_transformer;

pub use mock_metrics::MockMetricsSource;
pub use mock_releaser::MockReleaser;
pub use mock_transformer::MockTransformer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    use crate::item::NewImage;

    /// Encode a solid-color PNG of the given size.
    pub fn png_bytes(width: u32, height: u32) -> Result<Vec<u8>, image::ImageError> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Encode a solid-color JPEG of the given size, without EXIF.
    pub fn jpeg_bytes(width: u32, height: u32) -> Result<Vec<u8>, image::ImageError> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg)?;
        Ok(out.into_inner())
    }

    /// A JPEG carrying an EXIF segment whose only field is `Make`.
    pub fn jpeg_with_exif(make: &str) -> Result<Vec<u8>, image::ImageError> {
        let jpeg = jpeg_bytes(8, 8)?;

        let mut value = make.as_bytes().to_vec();
        value.push(0);
        let count = value.len() as u32;

        // Big-endian TIFF header, IFD0 at offset 8 with one ASCII entry. A
        // value over four bytes follows the IFD (8 + 2 + 12 + 4 = 26).
        let mut tiff = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x010Fu16.to_be_bytes());
        tiff.extend_from_slice(&2u16.to_be_bytes());
        tiff.extend_from_slice(&count.to_be_bytes());
        if value.len() <= 4 {
            // Short values live in the offset slot itself.
            value.resize(4, 0);
            tiff.extend_from_slice(&value);
            tiff.extend_from_slice(&0u32.to_be_bytes());
        } else {
            tiff.extend_from_slice(&26u32.to_be_bytes());
            tiff.extend_from_slice(&0u32.to_be_bytes());
            tiff.extend_from_slice(&value);
        }

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        // APP1 right after SOI.
        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        Ok(out)
    }

    /// `n` images with distinct placeholder contents, named `image-{i}.png`.
    pub fn images(n: usize) -> Vec<NewImage> {
        (0..n).map(image).collect()
    }

    /// A single image whose bytes identify it as number `i`.
    pub fn image(i: usize) -> NewImage {
        NewImage::new(format!("image-{i}.png"), image_bytes(i))
    }

    /// Placeholder contents of image number `i`.
    pub fn image_bytes(i: usize) -> Vec<u8> {
        format!("image-bytes-{i}").into_bytes()
    }
}
