//! Types for the upload lifecycle.

use bytes::Bytes;
use imprint_core::models::Upload;
use uuid::Uuid;

use crate::metadata::ProcessingMetadata;

/// Raw upload as received from a caller.
#[derive(Clone, Debug)]
pub struct NewUpload {
    pub data: Bytes,
    pub filename: String,
    pub content_type: String,
    /// Absent means pass-through
    pub template_id: Option<Uuid>,
}

impl NewUpload {
    pub fn new(
        data: impl Into<Bytes>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        NewUpload {
            data: data.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            template_id: None,
        }
    }

    pub fn with_template(mut self, template_id: Uuid) -> Self {
        self.template_id = Some(template_id);
        self
    }
}

/// Terminal state of one lifecycle run.
#[derive(Clone, Debug)]
pub struct UploadOutcome {
    pub upload: Upload,
    /// Processed bytes, present only when the upload completed
    pub data: Option<Bytes>,
    pub metadata: Option<ProcessingMetadata>,
}

impl UploadOutcome {
    pub fn is_completed(&self) -> bool {
        self.data.is_some()
    }
}
