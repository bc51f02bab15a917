//! Upload record and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    /// pending -> processing | failed, processing -> completed | failed.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        matches!(
            (self, next),
            (UploadStatus::Pending, UploadStatus::Processing)
                | (UploadStatus::Pending, UploadStatus::Failed)
                | (UploadStatus::Processing, UploadStatus::Completed)
                | (UploadStatus::Processing, UploadStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "processing" => Ok(UploadStatus::Processing),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}

/// One submitted file and the outcome of applying a template to it.
///
/// Result fields are filled in progressively: original dimensions at creation,
/// the template version when processing starts, and everything else in a
/// single step on completion. `storage_key`/`storage_url` are only ever set on
/// a completed upload, `error` only on a failed one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Upload {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub staging_path: Option<String>,
    pub template_id: Option<Uuid>,
    pub template_version: Option<i32>,
    pub original_width: Option<i32>,
    pub original_height: Option<i32>,
    pub processed_width: Option<i32>,
    pub processed_height: Option<i32>,
    pub output_format: Option<String>,
    pub output_size_bytes: Option<i64>,
    pub storage_key: Option<String>,
    pub storage_url: Option<String>,
    pub status: UploadStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields recorded together when an upload completes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedUpload {
    pub processed_width: u32,
    pub processed_height: u32,
    pub output_format: String,
    pub output_size_bytes: u64,
    pub storage_key: String,
    pub storage_url: String,
}

impl Upload {
    /// New pending upload.
    pub fn new(
        id: Uuid,
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: usize,
        template_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Upload {
            id,
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            size_bytes: size_bytes as i64,
            staging_path: None,
            template_id,
            template_version: None,
            original_width: None,
            original_height: None,
            processed_width: None,
            processed_height: None,
            output_format: None,
            output_size_bytes: None,
            storage_key: None,
            storage_url: None,
            status: UploadStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn set_original_dimensions(&mut self, width: u32, height: u32) {
        self.original_width = Some(width as i32);
        self.original_height = Some(height as i32);
    }

    fn transition(&mut self, next: UploadStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// pending -> processing, pinning the template version the run uses.
    pub fn begin_processing(&mut self, template_version: Option<i32>) -> Result<(), AppError> {
        self.transition(UploadStatus::Processing)?;
        self.template_version = template_version;
        Ok(())
    }

    /// processing -> completed, recording every result field at once.
    pub fn complete(&mut self, result: CompletedUpload) -> Result<(), AppError> {
        self.transition(UploadStatus::Completed)?;
        self.processed_width = Some(result.processed_width as i32);
        self.processed_height = Some(result.processed_height as i32);
        self.output_format = Some(result.output_format);
        self.output_size_bytes = Some(result.output_size_bytes as i64);
        self.storage_key = Some(result.storage_key);
        self.storage_url = Some(result.storage_url);
        self.staging_path = None;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// pending | processing -> failed with a human-readable cause.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), AppError> {
        self.transition(UploadStatus::Failed)?;
        self.error = Some(reason.into());
        self.storage_key = None;
        self.storage_url = None;
        self.staging_path = None;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }
}
