use imprint_core::models::{Template, UpdateTemplateRequest, Upload, UploadStatus};
use imprint_core::AppError;
use uuid::Uuid;

/// Persistence for templates.
///
/// Implementations keep names unique (duplicates fail with
/// [`AppError::Conflict`]) and keep at most one template flagged as default:
/// any write that sets `is_default` clears the flag on every other template
/// in the same atomic step.
#[async_trait::async_trait]
pub trait TemplateStore: Send + Sync {
    async fn create(&self, template: Template) -> Result<Template, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Template>, AppError>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Template>, AppError>;

    async fn get_default(&self) -> Result<Option<Template>, AppError>;

    /// All templates ordered by name
    async fn list(&self, active_only: bool) -> Result<Vec<Template>, AppError>;

    /// Apply a partial update and bump the version. Missing ids are `NotFound`.
    async fn update(&self, id: Uuid, update: UpdateTemplateRequest) -> Result<Template, AppError>;

    /// Returns whether a row was removed
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn set_default(&self, id: Uuid) -> Result<Template, AppError>;
}

/// Persistence for upload records.
#[async_trait::async_trait]
pub trait UploadStore: Send + Sync {
    async fn insert(&self, upload: &Upload) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Upload>, AppError>;

    /// Overwrite the stored record. Missing ids are `NotFound`.
    async fn update(&self, upload: &Upload) -> Result<(), AppError>;

    /// Oldest first
    async fn list_by_status(
        &self,
        status: UploadStatus,
        limit: i64,
    ) -> Result<Vec<Upload>, AppError>;
}
