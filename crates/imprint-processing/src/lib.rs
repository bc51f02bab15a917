//! Imprint Processing Library
//!
//! Template-driven image pipeline and the services built on it: the upload
//! lifecycle and template management.

pub mod error;
pub mod image;
pub mod metadata;
pub mod pipeline;
pub mod templates;
pub mod upload;
pub mod validator;

// Re-export commonly used types
pub use error::{DecorationStage, DecorationWarning, PipelineError};
pub use self::image::{
    EncodedImage, Encoder, Frame, Geometry, ImageOrientation, Tone, Watermark,
};
pub use metadata::{ImageMetadata, ProcessingMetadata, Stage};
pub use pipeline::{PipelineOutput, TemplatePipeline};
pub use templates::TemplateService;
pub use upload::{sanitize_filename, NewUpload, UploadLifecycle, UploadOutcome};
pub use validator::{MediaValidator, ValidationError};
