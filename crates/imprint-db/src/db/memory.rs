//! In-memory stores with the same semantics as the PostgreSQL repositories.
//!
//! Used when no `DATABASE_URL` is configured and throughout the tests. Every
//! multi-step write happens under a single write lock.

use std::collections::HashMap;

use imprint_core::models::{Template, UpdateTemplateRequest, Upload, UploadStatus};
use imprint_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{TemplateStore, UploadStore};

#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<Uuid, Template>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(templates: &HashMap<Uuid, Template>, name: &str, except: Uuid) -> bool {
    templates
        .values()
        .any(|t| t.id != except && t.name == name)
}

fn clear_defaults(templates: &mut HashMap<Uuid, Template>, except: Uuid) {
    for template in templates.values_mut() {
        if template.id != except && template.is_default {
            template.is_default = false;
            template.updated_at = chrono::Utc::now();
        }
    }
}

#[async_trait::async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn create(&self, template: Template) -> Result<Template, AppError> {
        let mut templates = self.templates.write().await;

        if name_taken(&templates, &template.name, template.id) {
            return Err(AppError::Conflict(format!(
                "Template name '{}' already exists",
                template.name
            )));
        }
        if templates.contains_key(&template.id) {
            return Err(AppError::Conflict(format!(
                "Template {} already exists",
                template.id
            )));
        }

        if template.is_default {
            clear_defaults(&mut templates, template.id);
        }
        templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Template>, AppError> {
        Ok(self.templates.read().await.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Template>, AppError> {
        let name = name.trim();
        Ok(self
            .templates
            .read()
            .await
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn get_default(&self) -> Result<Option<Template>, AppError> {
        Ok(self
            .templates
            .read()
            .await
            .values()
            .find(|t| t.is_default)
            .cloned())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Template>, AppError> {
        let mut list: Vec<Template> = self
            .templates
            .read()
            .await
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn update(&self, id: Uuid, update: UpdateTemplateRequest) -> Result<Template, AppError> {
        let mut templates = self.templates.write().await;

        let mut template = templates
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))?;
        template.apply_update(update);

        if name_taken(&templates, &template.name, id) {
            return Err(AppError::Conflict(format!(
                "Template name '{}' already exists",
                template.name
            )));
        }

        if template.is_default {
            clear_defaults(&mut templates, id);
        }
        templates.insert(id, template.clone());
        Ok(template)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.templates.write().await.remove(&id).is_some())
    }

    async fn set_default(&self, id: Uuid) -> Result<Template, AppError> {
        let mut templates = self.templates.write().await;

        if !templates.contains_key(&id) {
            return Err(AppError::NotFound(format!("Template {} not found", id)));
        }
        clear_defaults(&mut templates, id);

        let template = templates
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))?;
        template.is_default = true;
        template.updated_at = chrono::Utc::now();
        Ok(template.clone())
    }
}

#[derive(Default)]
pub struct InMemoryUploadStore {
    uploads: RwLock<HashMap<Uuid, Upload>>,
}

impl InMemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UploadStore for InMemoryUploadStore {
    async fn insert(&self, upload: &Upload) -> Result<(), AppError> {
        let mut uploads = self.uploads.write().await;
        if uploads.contains_key(&upload.id) {
            return Err(AppError::Conflict(format!(
                "Upload {} already exists",
                upload.id
            )));
        }
        uploads.insert(upload.id, upload.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Upload>, AppError> {
        Ok(self.uploads.read().await.get(&id).cloned())
    }

    async fn update(&self, upload: &Upload) -> Result<(), AppError> {
        let mut uploads = self.uploads.write().await;
        match uploads.get_mut(&upload.id) {
            Some(existing) => {
                *existing = upload.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Upload {} not found", upload.id))),
        }
    }

    async fn list_by_status(
        &self,
        status: UploadStatus,
        limit: i64,
    ) -> Result<Vec<Upload>, AppError> {
        let mut list: Vec<Upload> = self
            .uploads
            .read()
            .await
            .values()
            .filter(|u| u.status == status)
            .cloned()
            .collect();
        list.sort_by_key(|u| u.created_at);
        list.truncate(limit.max(0) as usize);
        Ok(list)
    }
}
