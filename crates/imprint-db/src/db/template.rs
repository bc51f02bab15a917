use chrono::{DateTime, Utc};
use imprint_core::models::{Template, TemplateSettings, UpdateTemplateRequest};
use imprint_core::AppError;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::store::TemplateStore;
use super::transaction::TransactionGuard;

const TEMPLATE_COLUMNS: &str =
    "id, name, description, version, settings, is_active, is_default, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    version: i32,
    settings: Json<TemplateSettings>,
    is_active: bool,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Template {
            id: row.id,
            name: row.name,
            description: row.description,
            version: row.version,
            settings: row.settings.0,
            is_active: row.is_active,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Unique-name violations become `Conflict`, everything else stays a database error.
fn map_write_error(err: sqlx::Error, name: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Template name '{}' already exists", name))
        }
        _ => AppError::Database(err),
    }
}

async fn clear_defaults(conn: &mut PgConnection, except: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE templates SET is_default = FALSE, updated_at = NOW() WHERE is_default AND id <> $1",
    )
    .bind(except)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Repository for templates on PostgreSQL
#[derive(Clone)]
pub struct PgTemplateRepository {
    pool: PgPool,
}

impl PgTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Template>, AppError> {
        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE id = $1 FOR UPDATE",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(row.map(Template::from))
    }
}

#[async_trait::async_trait]
impl TemplateStore for PgTemplateRepository {
    #[tracing::instrument(skip(self, template), fields(db.table = "templates", db.operation = "insert", db.record_id = %template.id))]
    async fn create(&self, template: Template) -> Result<Template, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        if template.is_default {
            clear_defaults(tx.conn()?, template.id).await?;
        }

        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            r#"
            INSERT INTO templates (id, name, description, version, settings, is_active, is_default, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.version)
        .bind(Json(&template.settings))
        .bind(template.is_active)
        .bind(template.is_default)
        .bind(template.created_at)
        .bind(template.updated_at)
        .fetch_one(tx.conn()?)
        .await
        .map_err(|e| map_write_error(e, &template.name))?;

        tx.commit().await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Template>, AppError> {
        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Template::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select"))]
    async fn get_by_name(&self, name: &str) -> Result<Option<Template>, AppError> {
        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE name = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Template::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select"))]
    async fn get_default(&self) -> Result<Option<Template>, AppError> {
        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE is_default LIMIT 1",
            TEMPLATE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Template::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "select"))]
    async fn list(&self, active_only: bool) -> Result<Vec<Template>, AppError> {
        let rows = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE ($1 = FALSE OR is_active) ORDER BY name ASC",
            TEMPLATE_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Template::from).collect())
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "templates", db.operation = "update", db.record_id = %id))]
    async fn update(&self, id: Uuid, update: UpdateTemplateRequest) -> Result<Template, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let mut template = Self::fetch_for_update(tx.conn()?, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))?;
        template.apply_update(update);

        if template.is_default {
            clear_defaults(tx.conn()?, id).await?;
        }

        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            r#"
            UPDATE templates
            SET name = $2, description = $3, version = $4, settings = $5,
                is_active = $6, is_default = $7, updated_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.version)
        .bind(Json(&template.settings))
        .bind(template.is_active)
        .bind(template.is_default)
        .bind(template.updated_at)
        .fetch_one(tx.conn()?)
        .await
        .map_err(|e| map_write_error(e, &template.name))?;

        tx.commit().await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "templates", db.operation = "update", db.record_id = %id))]
    async fn set_default(&self, id: Uuid) -> Result<Template, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        if Self::fetch_for_update(tx.conn()?, id).await?.is_none() {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Template {} not found", id)));
        }

        let cleared = clear_defaults(tx.conn()?, id).await?;

        let row = sqlx::query_as::<Postgres, TemplateRow>(&format!(
            "UPDATE templates SET is_default = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_one(tx.conn()?)
        .await?;

        tx.commit().await?;

        tracing::info!(template_id = %id, cleared, "Default template changed");
        Ok(row.into())
    }
}
