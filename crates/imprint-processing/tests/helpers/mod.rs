//! Test helpers: in-memory stores, local storage in a temp dir, storage doubles.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use imprint_core::models::{CreateTemplateRequest, Upload, UploadStatus};
use imprint_core::AppError;
use imprint_db::{InMemoryTemplateStore, InMemoryUploadStore, UploadStore};
use imprint_processing::{MediaValidator, TemplateService, UploadLifecycle};
use imprint_storage::{
    LocalStorage, StagingArea, Storage, StorageBackend, StorageError, StorageResult,
    StoreRequest, StoredObject,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestApp {
    pub lifecycle: UploadLifecycle,
    pub templates: TemplateService,
    pub uploads: Arc<InMemoryUploadStore>,
    pub storage: Arc<CountingStorage>,
    pub storage_dir: TempDir,
    pub staging_dir: TempDir,
}

impl TestApp {
    pub fn staging_is_empty(&self) -> bool {
        dir_is_empty(self.staging_dir.path())
    }

    pub async fn create_template(&self, value: serde_json::Value) -> uuid::Uuid {
        let request: CreateTemplateRequest =
            serde_json::from_value(value).expect("valid template request");
        self.templates
            .create(request)
            .await
            .expect("template created")
            .id
    }
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

/// App backed by local storage.
pub async fn setup_test_app() -> TestApp {
    setup_with(None, 50 * 1024 * 1024, false).await
}

/// App whose upload store rejects the write that completes an upload.
pub async fn setup_rejecting_completion_app() -> TestApp {
    setup_with(None, 50 * 1024 * 1024, true).await
}

/// App backed by local storage with a small upload limit.
pub async fn setup_limited_app(max_file_size: usize) -> TestApp {
    setup_with(None, max_file_size, false).await
}

/// App whose storage collaborator always fails.
pub async fn setup_failing_app() -> TestApp {
    setup_with(Some(Arc::new(FailingStorage)), 50 * 1024 * 1024, false).await
}

async fn setup_with(
    backend: Option<Arc<dyn Storage>>,
    max_file_size: usize,
    reject_completion: bool,
) -> TestApp {
    let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
    let staging_dir = tempfile::tempdir().expect("Failed to create staging directory");

    let backend: Arc<dyn Storage> = match backend {
        Some(backend) => backend,
        None => Arc::new(
            LocalStorage::new(storage_dir.path(), "http://localhost:3000/media".to_string())
                .await
                .expect("local storage"),
        ),
    };
    let storage = Arc::new(CountingStorage::new(backend));

    let uploads = Arc::new(InMemoryUploadStore::new());
    let template_store = Arc::new(InMemoryTemplateStore::new());
    let staging = StagingArea::new(staging_dir.path())
        .await
        .expect("staging area");
    let validator = MediaValidator::new(
        max_file_size,
        vec!["jpg".into(), "jpeg".into(), "png".into()],
        vec!["image/jpeg".into(), "image/png".into()],
    );

    let upload_store: Arc<dyn UploadStore> = if reject_completion {
        Arc::new(RejectCompletion {
            inner: uploads.clone(),
        })
    } else {
        uploads.clone()
    };

    let lifecycle = UploadLifecycle::new(
        upload_store,
        template_store.clone(),
        storage.clone(),
        staging,
        validator,
    );

    TestApp {
        lifecycle,
        templates: TemplateService::new(template_store),
        uploads,
        storage,
        storage_dir,
        staging_dir,
    }
}

/// Counts store calls before delegating.
pub struct CountingStorage {
    inner: Arc<dyn Storage>,
    stores: AtomicUsize,
}

impl CountingStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            stores: AtomicUsize::new(0),
        }
    }

    pub fn store_calls(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for CountingStorage {
    async fn store(&self, data: Vec<u8>, request: StoreRequest) -> StorageResult<StoredObject> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(data, request).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn store(&self, _data: Vec<u8>, request: StoreRequest) -> StorageResult<StoredObject> {
        Err(StorageError::UploadFailed(format!(
            "bucket unavailable for {}",
            request.filename
        )))
    }

    async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Upload store that refuses to persist a completed upload.
pub struct RejectCompletion {
    inner: Arc<InMemoryUploadStore>,
}

#[async_trait]
impl UploadStore for RejectCompletion {
    async fn insert(&self, upload: &Upload) -> Result<(), AppError> {
        self.inner.insert(upload).await
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Option<Upload>, AppError> {
        self.inner.get(id).await
    }

    async fn update(&self, upload: &Upload) -> Result<(), AppError> {
        if upload.status == UploadStatus::Completed {
            return Err(AppError::Internal("connection reset".to_string()));
        }
        self.inner.update(upload).await
    }

    async fn list_by_status(
        &self,
        status: UploadStatus,
        limit: i64,
    ) -> Result<Vec<Upload>, AppError> {
        self.inner.list_by_status(status, limit).await
    }
}
