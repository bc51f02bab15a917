use imprint_core::{AppError, Config};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connect to PostgreSQL and apply the embedded migrations.
pub async fn setup_database(config: &Config) -> Result<PgPool, AppError> {
    let url = config
        .database_url()
        .ok_or_else(|| AppError::Internal("DATABASE_URL is not configured".to_string()))?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database ready"
    );
    Ok(pool)
}
