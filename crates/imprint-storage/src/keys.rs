//! Shared key generation for storage backends.
//!
//! Key format: `images/{filename}` or `videos/{filename}`.

use crate::traits::{ResourceKind, StorageError, StorageResult};

/// Generate a storage key for the given resource kind and filename.
pub fn generate_storage_key(kind: ResourceKind, filename: &str) -> StorageResult<String> {
    let key = format!("{}/{}", kind.prefix(), filename);
    validate_key(&key)?;
    Ok(key)
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefix_by_kind() {
        assert_eq!(
            generate_storage_key(ResourceKind::Image, "a.jpg").unwrap(),
            "images/a.jpg"
        );
        assert_eq!(
            generate_storage_key(ResourceKind::Video, "b.mp4").unwrap(),
            "videos/b.mp4"
        );
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(generate_storage_key(ResourceKind::Image, "../etc/passwd").is_err());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("images/ok.png").is_ok());
    }
}
