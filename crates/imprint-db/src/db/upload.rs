use imprint_core::models::{Upload, UploadStatus};
use imprint_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::UploadStore;

const UPLOAD_COLUMNS: &str = "id, original_filename, content_type, size_bytes, staging_path, \
    template_id, template_version, original_width, original_height, processed_width, \
    processed_height, output_format, output_size_bytes, storage_key, storage_url, status, \
    error, created_at, updated_at, completed_at";

/// Repository for upload records on PostgreSQL
#[derive(Clone)]
pub struct PgUploadRepository {
    pool: PgPool,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UploadStore for PgUploadRepository {
    #[tracing::instrument(skip(self, upload), fields(db.table = "uploads", db.operation = "insert", db.record_id = %upload.id))]
    async fn insert(&self, upload: &Upload) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO uploads (
                id, original_filename, content_type, size_bytes, staging_path,
                template_id, template_version, original_width, original_height,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(upload.id)
        .bind(&upload.original_filename)
        .bind(&upload.content_type)
        .bind(upload.size_bytes)
        .bind(&upload.staging_path)
        .bind(upload.template_id)
        .bind(upload.template_version)
        .bind(upload.original_width)
        .bind(upload.original_height)
        .bind(upload.status)
        .bind(upload.created_at)
        .bind(upload.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Upload>, AppError> {
        let upload = sqlx::query_as::<Postgres, Upload>(&format!(
            "SELECT {} FROM uploads WHERE id = $1",
            UPLOAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(upload)
    }

    /// All mutable columns are written in one statement, so a completed
    /// record never shows a storage key without its dimensions.
    #[tracing::instrument(skip(self, upload), fields(db.table = "uploads", db.operation = "update", db.record_id = %upload.id, status = %upload.status))]
    async fn update(&self, upload: &Upload) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE uploads
            SET staging_path = $2, template_version = $3,
                original_width = $4, original_height = $5,
                processed_width = $6, processed_height = $7,
                output_format = $8, output_size_bytes = $9,
                storage_key = $10, storage_url = $11,
                status = $12, error = $13,
                updated_at = $14, completed_at = $15
            WHERE id = $1
            "#,
        )
        .bind(upload.id)
        .bind(&upload.staging_path)
        .bind(upload.template_version)
        .bind(upload.original_width)
        .bind(upload.original_height)
        .bind(upload.processed_width)
        .bind(upload.processed_height)
        .bind(&upload.output_format)
        .bind(upload.output_size_bytes)
        .bind(&upload.storage_key)
        .bind(&upload.storage_url)
        .bind(upload.status)
        .bind(&upload.error)
        .bind(upload.updated_at)
        .bind(upload.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Upload {} not found", upload.id)));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn list_by_status(
        &self,
        status: UploadStatus,
        limit: i64,
    ) -> Result<Vec<Upload>, AppError> {
        let uploads = sqlx::query_as::<Postgres, Upload>(&format!(
            "SELECT {} FROM uploads WHERE status = $1 ORDER BY created_at ASC LIMIT $2",
            UPLOAD_COLUMNS
        ))
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(uploads)
    }
}
