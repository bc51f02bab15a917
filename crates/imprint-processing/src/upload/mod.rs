//! Upload lifecycle: validate → stage → pending → processing → completed | failed.

pub mod lifecycle;
pub mod types;

pub use lifecycle::{sanitize_filename, UploadLifecycle};
pub use types::{NewUpload, UploadOutcome};
