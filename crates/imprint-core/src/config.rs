//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env`) and
//! exposed through getters. `DATABASE_URL` is optional: without it the
//! in-memory stores are used.

use std::env;
use std::path::PathBuf;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const MAX_FILE_SIZE_MB: usize = 10;
const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,gif,webp";
const DEFAULT_CONTENT_TYPES: &str = "image/jpeg,image/png,image/gif,image/webp";

#[derive(Clone, Debug)]
pub struct Config {
    environment: String,
    database_url: Option<String>,
    db_max_connections: u32,
    storage_backend: StorageBackend,
    local_storage_path: Option<String>,
    local_storage_base_url: Option<String>,
    s3_bucket: Option<String>,
    s3_region: Option<String>,
    s3_endpoint: Option<String>,
    staging_dir: PathBuf,
    max_file_size_bytes: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let staging_dir = env::var("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("imprint-staging"));

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            staging_dir,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions: parse_list(
                &env::var("ALLOWED_EXTENSIONS").unwrap_or_else(|_| DEFAULT_EXTENSIONS.to_string()),
            ),
            allowed_content_types: parse_list(
                &env::var("ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| DEFAULT_CONTENT_TYPES.to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Local-storage configuration with default upload limits and no database.
    pub fn local(
        storage_path: impl Into<String>,
        base_url: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Config {
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(storage_path.into()),
            local_storage_base_url: Some(base_url.into()),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            staging_dir: staging_dir.into(),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: parse_list(DEFAULT_EXTENSIONS),
            allowed_content_types: parse_list(DEFAULT_CONTENT_TYPES),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn staging_dir(&self) -> &PathBuf {
        &self.staging_dir
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    pub fn with_max_file_size_bytes(mut self, bytes: usize) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_normalizes() {
        assert_eq!(
            parse_list(" JPG, png,,webp "),
            vec!["jpg".to_string(), "png".to_string(), "webp".to_string()]
        );
    }

    #[test]
    fn test_local_config_is_valid() {
        let config = Config::local("/tmp/imprint", "http://localhost/media", "/tmp/staging");
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_backend(), StorageBackend::Local);
        assert_eq!(config.max_file_size_bytes(), 10 * 1024 * 1024);
        assert!(config.allowed_extensions().contains(&"jpeg".to_string()));
        assert!(config.database_url().is_none());
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut config = Config::local("/tmp/imprint", "http://localhost/media", "/tmp/staging");
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());
        config.s3_bucket = Some("media".to_string());
        config.s3_region = Some("eu-west-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let mut config = Config::local("/tmp/imprint", "http://localhost/media", "/tmp/staging");
        config.database_url = Some("mysql://localhost/db".to_string());
        assert!(config.validate().is_err());
    }
}
