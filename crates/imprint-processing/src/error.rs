use imprint_core::AppError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Failures that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Crop region {x},{y} {width}x{height} exceeds image bounds {image_width}x{image_height}")]
    InvalidRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Geometry failed: {0}")]
    Geometry(String),

    #[error("Failed to encode {format}: {message}")]
    Encode { format: String, message: String },

    #[error("Pipeline aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    pub fn encode(format: impl Display, err: impl Display) -> Self {
        PipelineError::Encode {
            format: format.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Decode(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Decode(message) => AppError::Decode(message),
            PipelineError::InvalidRegion { .. } => AppError::Validation(err.to_string()),
            other => AppError::Pipeline(other.to_string()),
        }
    }
}

/// Stage that produced a [`DecorationWarning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecorationStage {
    Frame,
    Watermark,
}

impl Display for DecorationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DecorationStage::Frame => write!(f, "frame"),
            DecorationStage::Watermark => write!(f, "watermark"),
        }
    }
}

/// Non-fatal failure of a decoration stage. The stage's input is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{stage} skipped: {message}")]
pub struct DecorationWarning {
    pub stage: DecorationStage,
    pub message: String,
}

impl DecorationWarning {
    pub fn new(stage: DecorationStage, message: impl Into<String>) -> Self {
        DecorationWarning {
            stage,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_region_maps_to_validation() {
        let err = PipelineError::InvalidRegion {
            x: 0,
            y: 0,
            width: 5000,
            height: 5000,
            image_width: 800,
            image_height: 600,
        };
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Validation(ref m) if m.contains("800x600")));
    }

    #[test]
    fn test_decode_and_encode_mapping() {
        let app: AppError = PipelineError::Decode("truncated".into()).into();
        assert!(matches!(app, AppError::Decode(_)));

        let app: AppError = PipelineError::encode("avif", "encoder busy").into();
        assert!(matches!(app, AppError::Pipeline(ref m) if m.contains("avif")));
    }

    #[test]
    fn test_warning_display() {
        let warning = DecorationWarning::new(DecorationStage::Frame, "bad svg");
        assert_eq!(warning.to_string(), "frame skipped: bad svg");
    }
}
