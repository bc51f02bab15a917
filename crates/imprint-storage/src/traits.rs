//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use imprint_core::AppError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(key),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Kind of resource being stored; selects the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Video,
}

impl ResourceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::Image => "images",
            ResourceKind::Video => "videos",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Video => write!(f, "video"),
        }
    }
}

/// Destination hint for a store call.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub filename: String,
    pub content_type: String,
    pub kind: ResourceKind,
    /// Pixel dimensions of the payload, reported back on the stored object
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl StoreRequest {
    pub fn image(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        StoreRequest {
            filename: filename.into(),
            content_type: content_type.into(),
            kind: ResourceKind::Image,
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// What the backend reports after a successful store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Internal identifier used to reference the object
    pub key: String,
    /// Publicly accessible URL
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: u64,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait so the
/// upload lifecycle can hand off processed bytes without knowing where they go.
///
/// **Key format:** `images/{filename}` or `videos/{filename}`. See the crate root
/// documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` and return its identifier and URL
    async fn store(&self, data: Vec<u8>, request: StoreRequest) -> StorageResult<StoredObject>;

    /// Delete an object by its storage key. Missing objects are not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
