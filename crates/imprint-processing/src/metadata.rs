//! Image metadata types

use image::{ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::{DecorationWarning, PipelineError};
use crate::image::ImageOrientation;

/// Header-level facts about an encoded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Lowercase format name, e.g. `jpeg`, `png`
    pub format: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl ImageMetadata {
    /// Read upright dimensions and format from the header without decoding
    /// pixels. A 90° EXIF orientation swaps width and height.
    pub fn probe(data: &[u8]) -> Result<Self, PipelineError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| PipelineError::Decode("Unrecognized image format".to_string()))?;
        let mut decoder = reader.into_decoder()?;
        let (width, height) = decoder.dimensions();
        let (width, height) = if ImageOrientation::swaps_dimensions(decoder.orientation()?) {
            (height, width)
        } else {
            (width, height)
        };

        Ok(ImageMetadata {
            width,
            height,
            format: format!("{:?}", format).to_lowercase(),
            mime_type: format.to_mime_type().to_string(),
            size_bytes: data.len() as u64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Geometry,
    Tone,
    Frame,
    Watermark,
    Encode,
}

/// What a pipeline run did, reported alongside the output bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub original_width: u32,
    pub original_height: u32,
    pub processed_width: u32,
    pub processed_height: u32,
    pub format: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Stages that changed the image, in execution order
    pub stages: Vec<Stage>,
    pub warnings: Vec<DecorationWarning>,
}

impl ProcessingMetadata {
    /// Metadata for bytes passed through untouched.
    pub fn passthrough(probe: &ImageMetadata) -> Self {
        ProcessingMetadata {
            original_width: probe.width,
            original_height: probe.height,
            processed_width: probe.width,
            processed_height: probe.height,
            format: probe.format.clone(),
            mime_type: probe.mime_type.clone(),
            size_bytes: probe.size_bytes,
            stages: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
