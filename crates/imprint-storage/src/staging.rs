//! Staging area for raw uploads.
//!
//! Each upload gets one write-once file. A [`StagedFile`] owns that file and
//! removes it when dropped, so every exit path of the lifecycle cleans up
//! without explicit bookkeeping.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub async fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(StagingArea { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, upload_id: Uuid, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            self.dir.join(upload_id.to_string())
        } else {
            self.dir.join(format!("{}.{}", upload_id, extension))
        }
    }

    /// Write `data` to a fresh staging file. Refuses to overwrite.
    pub async fn stage(
        &self,
        upload_id: Uuid,
        extension: &str,
        data: &[u8],
    ) -> StorageResult<StagedFile> {
        let path = self.path_for(upload_id, extension);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    StorageError::AlreadyExists(path.display().to_string())
                }
                _ => StorageError::IoError(e),
            })?;

        // From here on the guard owns the file, including on write failure.
        let staged = StagedFile::adopt(path);
        file.write_all(data).await?;
        file.sync_all().await?;

        tracing::debug!(
            path = %staged.path().display(),
            size_bytes = data.len(),
            "Staged upload"
        );

        Ok(staged)
    }
}

/// Owning handle to a staging file; deletes it on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    /// Take ownership of an existing staging file.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        StagedFile {
            path: path.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> StorageResult<Vec<u8>> {
        fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(self.path.display().to_string()),
            _ => StorageError::IoError(e),
        })
    }

    /// Give up ownership and leave the file on disk. Someone must
    /// [`adopt`](Self::adopt) it later.
    pub fn keep(mut self) -> PathBuf {
        self.removed = true;
        std::mem::take(&mut self.path)
    }

    /// Delete the file now. Already-missing files are fine.
    pub async fn cleanup(mut self) -> StorageResult<()> {
        self.removed = true;
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            fs::remove_file(&self.path).await?;
            tracing::debug!(path = %self.path.display(), "Removed staging file");
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staging file"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staging file"
            ),
        }
    }
}
