//! Imprint Storage Library
//!
//! The storage collaborator that receives processed bytes, plus the staging
//! area that holds raw uploads while they are processed.
//!
//! # Storage key format
//!
//! All backends use the same key layout:
//!
//! - **Images**: `images/{filename}`
//! - **Videos**: `videos/{filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod staging;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use imprint_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use staging::{StagedFile, StagingArea};
pub use traits::{
    ResourceKind, Storage, StorageError, StorageResult, StoreRequest, StoredObject,
};
