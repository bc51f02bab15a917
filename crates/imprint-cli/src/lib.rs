//! Shared helpers for the `imprint` binary.

use anyhow::Context;
use imprint_core::models::{CreateTemplateRequest, TemplateSettings};
use imprint_core::Config;
use imprint_db::{
    setup_database, InMemoryTemplateStore, InMemoryUploadStore, PgTemplateRepository,
    PgUploadRepository, TemplateStore, UploadStore,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Content type implied by a file's extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(content_type)
}

/// Read a template document. Accepts either a full template request
/// (`{"name": ..., "settings": {...}}`) or a bare settings object.
pub fn load_template(path: &Path) -> anyhow::Result<CreateTemplateRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Template {} is not valid JSON", path.display()))?;

    let request = if value.get("settings").is_some() {
        serde_json::from_value::<CreateTemplateRequest>(value)?
    } else {
        let settings: TemplateSettings = serde_json::from_value(value)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("template")
            .to_string();
        CreateTemplateRequest {
            name,
            description: None,
            settings,
            is_active: true,
            is_default: false,
        }
    };

    request
        .validate()
        .with_context(|| format!("Template {} is invalid", path.display()))?;
    Ok(request)
}

/// Template and upload stores for a configuration.
pub struct Stores {
    pub templates: Arc<dyn TemplateStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub persistent: bool,
}

/// PostgreSQL when `DATABASE_URL` is set, in-memory otherwise.
pub async fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    if config.database_url().is_none() {
        tracing::info!("DATABASE_URL not set, using in-memory stores");
        return Ok(Stores {
            templates: Arc::new(InMemoryTemplateStore::new()),
            uploads: Arc::new(InMemoryUploadStore::new()),
            persistent: false,
        });
    }

    let pool = setup_database(config).await?;
    Ok(Stores {
        templates: Arc::new(PgTemplateRepository::new(pool.clone())),
        uploads: Arc::new(PgUploadRepository::new(pool)),
        persistent: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/b/photo.JPG")), Some("image/jpeg"));
        assert_eq!(content_type_for(Path::new("scan.png")), Some("image/png"));
        assert_eq!(content_type_for(Path::new("notes.txt")), None);
        assert_eq!(content_type_for(Path::new("README")), None);
    }

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_bare_settings() {
        let (_dir, path) = write_temp(
            "square.json",
            r#"{ "geometry": { "width": 1080, "height": 1080, "fit": "cover" } }"#,
        );
        let request = load_template(&path).unwrap();
        assert_eq!(request.name, "square");
        assert_eq!(request.settings.geometry.width, 1080);
        assert!(request.is_active);
    }

    #[test]
    fn test_load_full_request() {
        let (_dir, path) = write_temp(
            "t.json",
            r#"{ "name": "hero-banner", "settings": { "geometry": { "width": 1600, "height": 400 } } }"#,
        );
        assert_eq!(load_template(&path).unwrap().name, "hero-banner");
    }

    #[test]
    fn test_load_rejects_out_of_range() {
        let (_dir, path) = write_temp(
            "huge.json",
            r#"{ "geometry": { "width": 9000, "height": 100 } }"#,
        );
        assert!(load_template(&path).is_err());
    }
}
