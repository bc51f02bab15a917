//! imprint: run images through templates from the command line.
//!
//! Configuration comes from the environment (see `Config::from_env`). Without
//! DATABASE_URL, templates and uploads live only for the duration of the
//! command.

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use imprint_cli::{content_type_for, init_tracing, load_template, open_stores, print_json};
use imprint_core::Config;
use imprint_processing::{NewUpload, TemplatePipeline, TemplateService, UploadLifecycle};
use imprint_storage::create_storage;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "imprint", about = "Template-driven image processing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a file through a template without storing anything
    Render {
        /// Source image
        input: PathBuf,
        /// Where to write the result
        output: PathBuf,
        /// Template document (JSON); pass-through when omitted
        #[arg(long, value_name = "FILE")]
        template: Option<PathBuf>,
    },
    /// Run the full upload lifecycle: validate, stage, process, store
    Upload {
        /// Image to upload
        file: PathBuf,
        /// Name of a stored template
        #[arg(long, conflicts_with = "template_file")]
        template: Option<String>,
        /// Template document to register before uploading
        #[arg(long, value_name = "FILE")]
        template_file: Option<PathBuf>,
        /// Content type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Check a template document against the parameter bounds
    ValidateTemplate {
        /// Template document (JSON)
        file: PathBuf,
    },
    /// Manage stored templates
    Templates {
        #[command(subcommand)]
        sub: TemplateCommands,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List templates
    List {
        /// Only active templates
        #[arg(long)]
        active: bool,
    },
    /// Create a template from a JSON document
    Create {
        file: PathBuf,
    },
    /// Delete a template by ID
    Delete {
        id: Uuid,
    },
    /// Make a template the default
    SetDefault {
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            input,
            output,
            template,
        } => {
            let settings = match template {
                Some(path) => Some(load_template(&path)?.settings),
                None => None,
            };
            let data = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let result = TemplatePipeline::new()
                .execute(Bytes::from(data), settings)
                .await?;
            tokio::fs::write(&output, &result.data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            print_json(&result.metadata)?;
        }
        Commands::Upload {
            file,
            template,
            template_file,
            content_type,
        } => {
            let config = Config::from_env()?;
            config.validate()?;

            let stores = open_stores(&config).await?;
            let storage = create_storage(&config).await?;
            let templates = TemplateService::new(stores.templates.clone());
            let lifecycle =
                UploadLifecycle::from_config(&config, stores.uploads, stores.templates, storage)
                    .await?;

            let template_id = match (template, template_file) {
                (Some(name), _) => Some(templates.get_by_name(&name).await?.id),
                (None, Some(path)) => Some(templates.create(load_template(&path)?).await?.id),
                (None, None) => None,
            };

            let content_type = match content_type {
                Some(ct) => ct,
                None => content_type_for(&file)
                    .map(String::from)
                    .with_context(|| format!("Cannot infer content type of {}", file.display()))?,
            };
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let mut request = NewUpload::new(Bytes::from(data), filename, content_type);
            if let Some(id) = template_id {
                request = request.with_template(id);
            }

            let outcome = lifecycle.process(request).await?;
            print_json(&outcome.upload)?;
            if !outcome.is_completed() {
                anyhow::bail!(
                    "Upload {} failed: {}",
                    outcome.upload.id,
                    outcome.upload.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Commands::ValidateTemplate { file } => {
            let request = load_template(&file)?;
            print_json(&serde_json::json!({
                "valid": true,
                "name": request.name,
                "settings": request.settings,
            }))?;
        }
        Commands::Templates { sub } => {
            let config = Config::from_env()?;
            config.validate()?;
            let stores = open_stores(&config).await?;
            if !stores.persistent {
                tracing::warn!("Template changes will not outlive this command");
            }
            let templates = TemplateService::new(stores.templates);

            match sub {
                TemplateCommands::List { active } => {
                    print_json(&templates.list(active).await?)?;
                }
                TemplateCommands::Create { file } => {
                    print_json(&templates.create(load_template(&file)?).await?)?;
                }
                TemplateCommands::Delete { id } => {
                    templates.delete(id).await?;
                    print_json(&serde_json::json!({ "deleted": id }))?;
                }
                TemplateCommands::SetDefault { id } => {
                    print_json(&templates.set_default(id).await?)?;
                }
            }
        }
    }

    Ok(())
}
