//! Template pipeline: decode → Geometry → Tone → Frame → Watermark → Encode.
//!
//! The pipeline is pure: it takes bytes and a settings document and returns
//! bytes plus a [`ProcessingMetadata`] report. It never persists anything.
//! Decode, Geometry and Encode failures abort the run; a Frame rendering
//! failure is recorded as a warning and the image continues unframed.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageReader};
use imprint_core::models::TemplateSettings;
use std::io::Cursor;

use crate::error::PipelineError;
use crate::image::{Encoder, Frame, Geometry, ImageOrientation, Tone, Watermark};
use crate::metadata::{ImageMetadata, ProcessingMetadata, Stage};

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub data: Bytes,
    pub metadata: ProcessingMetadata,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePipeline;

impl TemplatePipeline {
    pub fn new() -> Self {
        TemplatePipeline
    }

    /// Run on a blocking thread so decode and encode stay off the async runtime.
    pub async fn execute(
        &self,
        data: Bytes,
        settings: Option<TemplateSettings>,
    ) -> Result<PipelineOutput, PipelineError> {
        let pipeline = *self;
        tokio::task::spawn_blocking(move || pipeline.run(&data, settings.as_ref()))
            .await
            .map_err(|e| PipelineError::Aborted(e.to_string()))?
    }

    /// Without settings the bytes pass through untouched; only the header is read.
    pub fn run(
        &self,
        data: &[u8],
        settings: Option<&TemplateSettings>,
    ) -> Result<PipelineOutput, PipelineError> {
        match settings {
            None => {
                let probe = ImageMetadata::probe(data)?;
                tracing::debug!(
                    width = probe.width,
                    height = probe.height,
                    format = %probe.format,
                    "Pass-through, no template attached"
                );
                Ok(PipelineOutput {
                    data: Bytes::copy_from_slice(data),
                    metadata: ProcessingMetadata::passthrough(&probe),
                })
            }
            Some(settings) => self.transform(data, settings),
        }
    }

    fn transform(
        &self,
        data: &[u8],
        settings: &TemplateSettings,
    ) -> Result<PipelineOutput, PipelineError> {
        let start = std::time::Instant::now();
        let img = Self::decode(data)?;
        let (original_width, original_height) = img.dimensions();

        let mut stages = Vec::new();
        let mut warnings = Vec::new();

        let mut img = Geometry::apply(img, &settings.geometry)?;
        stages.push(Stage::Geometry);

        if !Tone::is_identity(&settings.tone) {
            img = Tone::apply(img, &settings.tone);
            stages.push(Stage::Tone);
        }

        if settings.frame.enabled {
            match Frame::apply(&img, &settings.frame) {
                Ok(framed) => {
                    img = framed;
                    stages.push(Stage::Frame);
                }
                Err(warning) => {
                    tracing::warn!(error = %warning, "Frame stage skipped");
                    warnings.push(warning);
                }
            }
        }

        if Watermark::is_active(&settings.watermark) {
            img = Watermark::apply(&img, &settings.watermark);
            stages.push(Stage::Watermark);
        }

        let encoded = Encoder::encode(&img, &settings.output, Some(data))?;
        stages.push(Stage::Encode);

        tracing::info!(
            original_width,
            original_height,
            width = encoded.width,
            height = encoded.height,
            format = %encoded.format,
            size_bytes = encoded.size_bytes(),
            warnings = warnings.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Template pipeline completed"
        );

        Ok(PipelineOutput {
            metadata: ProcessingMetadata {
                original_width,
                original_height,
                processed_width: encoded.width,
                processed_height: encoded.height,
                format: encoded.format.to_string(),
                mime_type: encoded.format.mime_type().to_string(),
                size_bytes: encoded.size_bytes(),
                stages,
                warnings,
            },
            data: encoded.data,
        })
    }

    fn decode(data: &[u8]) -> Result<DynamicImage, PipelineError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        if reader.format().is_none() {
            return Err(PipelineError::Decode("Unrecognized image format".to_string()));
        }
        ImageOrientation::decode_upright(reader.into_decoder()?)
    }
}
