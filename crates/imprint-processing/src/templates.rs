//! Template management on top of a [`TemplateStore`].
//!
//! Requests are validated here, once, so stages can trust every settings
//! document they receive.

use imprint_core::models::{CreateTemplateRequest, Template, UpdateTemplateRequest};
use imprint_core::AppError;
use imprint_db::TemplateStore;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct TemplateService {
    store: Arc<dyn TemplateStore>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateTemplateRequest) -> Result<Template, AppError> {
        request.validate()?;

        let template = self.store.create(Template::new(request)).await?;
        tracing::info!(
            template_id = %template.id,
            name = %template.name,
            is_default = template.is_default,
            "Template created"
        );
        Ok(template)
    }

    pub async fn get(&self, id: Uuid) -> Result<Template, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template {} not found", id)))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Template, AppError> {
        self.store
            .get_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template '{}' not found", name.trim())))
    }

    pub async fn get_default(&self) -> Result<Option<Template>, AppError> {
        self.store.get_default().await
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Template>, AppError> {
        self.store.list(active_only).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateTemplateRequest,
    ) -> Result<Template, AppError> {
        request.validate()?;

        let template = self.store.update(id, request).await?;
        tracing::info!(
            template_id = %template.id,
            version = template.version,
            "Template updated"
        );
        Ok(template)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("Template {} not found", id)));
        }
        tracing::info!(template_id = %id, "Template deleted");
        Ok(())
    }

    pub async fn set_default(&self, id: Uuid) -> Result<Template, AppError> {
        self.store.set_default(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imprint_db::InMemoryTemplateStore;
    use serde_json::json;

    fn service() -> TemplateService {
        TemplateService::new(Arc::new(InMemoryTemplateStore::new()))
    }

    fn request(name: &str, width: u32) -> CreateTemplateRequest {
        serde_json::from_value(json!({
            "name": name,
            "settings": { "geometry": { "width": width, "height": 100 } }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_settings_and_name() {
        let service = service();
        assert!(matches!(
            service.create(request("too-wide", 9000)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(request("1st", 100)).await,
            Err(AppError::Validation(_))
        ));
        assert!(service.list(false).await.unwrap().is_empty());

        let created = service.create(request(" hero ", 100)).await.unwrap();
        assert_eq!(created.name, "hero");
        assert_eq!(service.get_by_name("hero").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let service = service();
        service.create(request("square", 100)).await.unwrap();
        assert!(matches!(
            service.create(request("square", 200)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = service();
        let created = service.create(request("square", 100)).await.unwrap();

        let bad = UpdateTemplateRequest {
            name: Some("bad/name".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(created.id, bad).await,
            Err(AppError::Validation(_))
        ));

        let updated = service
            .update(
                created.id,
                UpdateTemplateRequest {
                    description: Some(Some("Instagram".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.delete(created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_default_moves_flag() {
        let service = service();
        let a = service.create(request("a", 100)).await.unwrap();
        let b = service.create(request("b", 100)).await.unwrap();

        service.set_default(a.id).await.unwrap();
        service.set_default(b.id).await.unwrap();

        let defaults: Vec<_> = service
            .list(false)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(service.get_default().await.unwrap().unwrap().id, b.id);
    }
}
