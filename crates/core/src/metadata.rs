//! Read-only EXIF inspection of source images.

use std::io::Cursor;

use serde::Serialize;
use tracing::debug;

/// One EXIF field of the primary image, rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataField {
    pub tag: String,
    pub value: String,
}

/// EXIF fields found in an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub has_metadata: bool,
    pub fields: Vec<MetadataField>,
}

impl ImageMetadata {
    /// Display value of the first field named `tag`.
    pub fn field(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }
}

/// Reads the primary-image EXIF fields of `bytes`.
///
/// Never fails: images without EXIF, and bytes that are no supported
/// container at all, report `has_metadata: false`.
pub fn read_metadata(bytes: &[u8]) -> ImageMetadata {
    let data = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(data) => data,
        Err(e) => {
            debug!("No EXIF data: {}", e);
            return ImageMetadata::default();
        }
    };

    let fields: Vec<MetadataField> = data
        .fields()
        .filter(|f| f.ifd_num == exif::In::PRIMARY)
        .map(|f| MetadataField {
            tag: f.tag.to_string(),
            value: f.display_value().with_unit(&data).to_string(),
        })
        .collect();

    ImageMetadata {
        has_metadata: !fields.is_empty(),
        fields,
    }
}
