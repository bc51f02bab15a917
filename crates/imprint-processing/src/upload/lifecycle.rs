//! Upload lifecycle service.
//!
//! `create_upload` validates the request, stages the raw bytes and records a
//! `pending` Upload. `run_pipeline` drives that Upload through `processing`
//! to `completed` or `failed`. The staging file is owned by a
//! [`StagedFile`] guard for the whole run, so it is removed on every exit
//! path, including early returns on store errors.

use bytes::Bytes;
use imprint_core::models::{CompletedUpload, TemplateSettings, Upload, UploadStatus};
use imprint_core::{AppError, Config};
use imprint_db::{TemplateStore, UploadStore};
use imprint_storage::{StagedFile, StagingArea, Storage, StoreRequest};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{NewUpload, UploadOutcome};
use crate::metadata::ImageMetadata;
use crate::pipeline::{PipelineOutput, TemplatePipeline};
use crate::validator::MediaValidator;

pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

#[derive(Clone)]
pub struct UploadLifecycle {
    uploads: Arc<dyn UploadStore>,
    templates: Arc<dyn TemplateStore>,
    storage: Arc<dyn Storage>,
    staging: StagingArea,
    validator: MediaValidator,
    pipeline: TemplatePipeline,
}

impl UploadLifecycle {
    pub fn new(
        uploads: Arc<dyn UploadStore>,
        templates: Arc<dyn TemplateStore>,
        storage: Arc<dyn Storage>,
        staging: StagingArea,
        validator: MediaValidator,
    ) -> Self {
        Self {
            uploads,
            templates,
            storage,
            staging,
            validator,
            pipeline: TemplatePipeline::new(),
        }
    }

    /// Build from configuration: validator limits and staging directory come
    /// from `config`, the collaborators are passed in.
    pub async fn from_config(
        config: &Config,
        uploads: Arc<dyn UploadStore>,
        templates: Arc<dyn TemplateStore>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, AppError> {
        let staging = StagingArea::new(config.staging_dir()).await?;
        Ok(Self::new(
            uploads,
            templates,
            storage,
            staging,
            MediaValidator::from_config(config),
        ))
    }

    /// Validate, stage and record a `pending` Upload.
    ///
    /// Validation failures, including a missing or inactive template, return
    /// an error and leave no record behind.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, size_bytes = request.data.len()))]
    pub async fn create_upload(&self, request: NewUpload) -> Result<Upload, AppError> {
        self.validator.validate_all(
            &request.filename,
            &request.content_type,
            request.data.len(),
        )?;

        if let Some(template_id) = request.template_id {
            let template = self.templates.get(template_id).await?.ok_or_else(|| {
                AppError::Validation(format!("Template {} does not exist", template_id))
            })?;
            if !template.is_active {
                return Err(AppError::Validation(format!(
                    "Template '{}' is not active",
                    template.name
                )));
            }
        }

        let id = Uuid::new_v4();
        let extension = MediaValidator::extension(&request.filename)?;
        let staged = self.staging.stage(id, &extension, &request.data).await?;

        let mut upload = Upload::new(
            id,
            sanitize_filename(&request.filename),
            request.content_type.to_lowercase(),
            request.data.len(),
            request.template_id,
        );
        upload.staging_path = Some(staged.path().display().to_string());

        // Undecodable headers are not a validation error: the run records the failure.
        match ImageMetadata::probe(&request.data) {
            Ok(probe) => upload.set_original_dimensions(probe.width, probe.height),
            Err(e) => tracing::debug!(upload_id = %id, error = %e, "Could not read image header"),
        }

        self.uploads.insert(&upload).await?;
        let _ = staged.keep();

        tracing::info!(
            upload_id = %upload.id,
            template_id = ?upload.template_id,
            "Upload created"
        );
        Ok(upload)
    }

    /// Drive a `pending` Upload to a terminal state.
    ///
    /// Processing failures (template gone, decode, invalid region, encode,
    /// storage) are not errors of this call: they are recorded on the
    /// returned `failed` Upload. Errors are returned for store failures and
    /// for Uploads that are not `pending`.
    #[tracing::instrument(skip(self), fields(upload_id = %upload_id))]
    pub async fn run_pipeline(&self, upload_id: Uuid) -> Result<UploadOutcome, AppError> {
        let mut upload = self.get_upload(upload_id).await?;
        if !upload.status.can_transition_to(UploadStatus::Processing) {
            return Err(AppError::InvalidTransition {
                from: upload.status,
                to: UploadStatus::Processing,
            });
        }

        let staged = upload.staging_path.as_deref().map(StagedFile::adopt);

        let (settings, template_version) = match upload.template_id {
            Some(template_id) => match self.templates.get(template_id).await? {
                Some(template) => (Some(template.settings), Some(template.version)),
                None => {
                    let reason = format!("Template {} no longer exists", template_id);
                    return self.fail(upload, reason, staged).await;
                }
            },
            None => (None, None),
        };

        upload.begin_processing(template_version)?;
        self.uploads.update(&upload).await?;
        tracing::info!(template_version = ?template_version, "Upload processing");

        let Some(staged) = staged else {
            return self.fail(upload, "Staged file is missing".to_string(), None).await;
        };

        let data = match staged.read().await {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                let reason = format!("Failed to read staged file: {}", e);
                return self.fail(upload, reason, Some(staged)).await;
            }
        };

        let output = match self.pipeline.execute(data, settings.clone()).await {
            Ok(output) => output,
            Err(e) => {
                let reason = AppError::from(e).to_string();
                return self.fail(upload, reason, Some(staged)).await;
            }
        };

        let request = self.store_request(&upload, settings.as_ref(), &output);
        let stored = match self.storage.store(output.data.to_vec(), request).await {
            Ok(stored) => stored,
            Err(e) => {
                let reason = AppError::from(e).to_string();
                return self.fail(upload, reason, Some(staged)).await;
            }
        };

        let processing = upload.clone();
        upload.complete(CompletedUpload {
            processed_width: output.metadata.processed_width,
            processed_height: output.metadata.processed_height,
            output_format: output.metadata.format.clone(),
            output_size_bytes: output.metadata.size_bytes,
            storage_key: stored.key.clone(),
            storage_url: stored.url.clone(),
        })?;

        if let Err(e) = self.uploads.update(&upload).await {
            // Keep storage free of objects no record points to.
            if let Err(delete_err) = self.storage.delete(&stored.key).await {
                tracing::warn!(
                    storage_key = %stored.key,
                    error = %delete_err,
                    "Failed to remove stored object after record update failed"
                );
            }
            self.record_failure(processing, format!("Failed to record completion: {}", e))
                .await;
            return Err(e);
        }

        Self::cleanup(staged).await;

        tracing::info!(
            storage_key = %stored.key,
            width = output.metadata.processed_width,
            height = output.metadata.processed_height,
            format = %output.metadata.format,
            size_bytes = output.metadata.size_bytes,
            "Upload completed"
        );

        Ok(UploadOutcome {
            upload,
            data: Some(output.data),
            metadata: Some(output.metadata),
        })
    }

    /// Create and run in one call.
    pub async fn process(&self, request: NewUpload) -> Result<UploadOutcome, AppError> {
        let upload = self.create_upload(request).await?;
        self.run_pipeline(upload.id).await
    }

    pub async fn get_upload(&self, id: Uuid) -> Result<Upload, AppError> {
        self.uploads
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload {} not found", id)))
    }

    fn store_request(
        &self,
        upload: &Upload,
        settings: Option<&TemplateSettings>,
        output: &PipelineOutput,
    ) -> StoreRequest {
        let extension = match settings {
            Some(settings) => settings.output.format.extension().to_string(),
            None => MediaValidator::extension(&upload.original_filename)
                .unwrap_or_else(|_| output.metadata.format.clone()),
        };

        StoreRequest::image(
            format!("{}.{}", upload.id, extension),
            output.metadata.mime_type.clone(),
        )
        .with_dimensions(
            output.metadata.processed_width,
            output.metadata.processed_height,
        )
    }

    async fn fail(
        &self,
        mut upload: Upload,
        reason: String,
        staged: Option<StagedFile>,
    ) -> Result<UploadOutcome, AppError> {
        tracing::error!(reason = %reason, status = %upload.status, "Upload failed");

        upload.fail(reason)?;
        self.uploads.update(&upload).await?;

        if let Some(staged) = staged {
            Self::cleanup(staged).await;
        }

        Ok(UploadOutcome {
            upload,
            data: None,
            metadata: None,
        })
    }

    /// Best-effort move to `failed` after the completion write was rejected.
    async fn record_failure(&self, mut upload: Upload, reason: String) {
        let result = match upload.fail(reason) {
            Ok(()) => self.uploads.update(&upload).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!(
                upload_id = %upload.id,
                error = %e,
                "Upload is stuck in processing, its record could not be updated"
            );
        }
    }

    async fn cleanup(staged: StagedFile) {
        let path = staged.path().display().to_string();
        if let Err(e) = staged.cleanup().await {
            tracing::warn!(path = %path, error = %e, "Failed to remove staging file");
        }
    }
}
