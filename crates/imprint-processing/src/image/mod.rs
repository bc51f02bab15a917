//! Image pipeline stages
//!
//! - Orientation: EXIF orientation applied at decode
//! - Geometry: manual crop, then resize with a fit mode
//! - Tone: color matrix, contrast, blur, sharpen
//! - Frame: decoration that degrades to a warning on failure
//! - Watermark: bitmap text, scaled down or clipped to fit
//! - Encode: output format, quality and metadata policy

pub mod encode;
pub mod frame;
pub mod geometry;
pub mod orientation;
pub mod tone;
pub mod watermark;

pub use encode::{EncodedImage, Encoder};
pub use frame::Frame;
pub use geometry::Geometry;
pub use orientation::ImageOrientation;
pub use tone::Tone;
pub use watermark::Watermark;
