//! Folder-level entry points.
//!
//! A trawl takes one folder holding resume PDFs and a `config.json` schema,
//! extracts every resume and writes a single result file next to them.
//! Every configuration problem (bad folder, bad schema, missing API key, no
//! PDFs) is reported before the first document is touched; after that only
//! an output write failure can make the call return `Err`.

use crate::batch::{BatchReport, BatchRunner};
use crate::config::TrawlConfig;
use crate::error::TrawlerError;
use crate::extract::DocumentExtractor;
use crate::output::BatchSummary;
use crate::pipeline::input::discover_documents;
use crate::pipeline::llm::{LlmVisionModel, VisionModel};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::schema::Schema;
use crate::writer::write_report;
use chrono::Local;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything a completed trawl produced.
#[derive(Debug, Clone)]
pub struct TrawlOutput {
    pub schema: Schema,
    pub report: BatchReport,
    /// Where the result file was written.
    pub output_path: PathBuf,
}

/// Environment variable holding the API key for `provider`.
///
/// `None` for local providers that need no key and for providers this crate
/// does not know; the latter are left to `ProviderFactory` to validate.
pub fn credential_env_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

fn require_credential(provider: &str) -> Result<(), TrawlerError> {
    let Some(env_var) = credential_env_var(provider) else {
        return Ok(());
    };
    match std::env::var(env_var) {
        Ok(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(TrawlerError::MissingCredential {
            provider: provider.to_string(),
            env_var: env_var.to_string(),
        }),
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, TrawlerError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TrawlerError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision model, from most-specific to least-specific:
///
/// 1. a pre-built [`VisionModel`] (`config.vision_model`), used as-is
/// 2. a pre-built provider (`config.provider`), wrapped without a key check
/// 3. `config.provider_name` + `config.model` through `ProviderFactory`,
///    after checking that the provider's API key is set
fn resolve_vision_model(config: &TrawlConfig) -> Result<Arc<dyn VisionModel>, TrawlerError> {
    if let Some(ref model) = config.vision_model {
        return Ok(Arc::clone(model));
    }

    let provider = match config.provider {
        Some(ref p) => Arc::clone(p),
        None => {
            require_credential(&config.provider_name)?;
            create_vision_provider(&config.provider_name, &config.model)?
        }
    };

    Ok(Arc::new(LlmVisionModel::new(
        provider,
        config.temperature,
        config.max_tokens,
        Duration::from_secs(config.api_timeout_secs),
    )))
}

fn resolve_rasterizer(config: &TrawlConfig) -> Arc<dyn Rasterizer> {
    match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(config.raster.clone())),
    }
}

/// Extract every resume in `folder` and write the result file into it.
pub async fn trawl_folder(
    folder: impl AsRef<Path>,
    config: &TrawlConfig,
) -> Result<TrawlOutput, TrawlerError> {
    trawl_folder_with_cancellation(folder, config, CancellationToken::new()).await
}

/// [`trawl_folder`] that stops early when `cancel` fires.
///
/// A cancelled trawl still writes its result file: finished documents keep
/// their results and the rest are recorded as cancelled failures.
pub async fn trawl_folder_with_cancellation(
    folder: impl AsRef<Path>,
    config: &TrawlConfig,
    cancel: CancellationToken,
) -> Result<TrawlOutput, TrawlerError> {
    let start = Instant::now();
    let folder = folder.as_ref();
    info!("Starting trawl: {}", folder.display());

    // ── Step 1: Input folder ─────────────────────────────────────────────
    if !folder.exists() {
        return Err(TrawlerError::InputFolderNotFound {
            path: folder.to_path_buf(),
        });
    }
    if !folder.is_dir() {
        return Err(TrawlerError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }

    // ── Step 2: Schema ───────────────────────────────────────────────────
    let schema = Schema::load(folder.join(&config.schema_file))?;
    info!(
        "Loaded schema: {} question(s) for '{}', {:?} output",
        schema.len(),
        schema.subject(),
        schema.output_mode()
    );

    // ── Step 3: Model ────────────────────────────────────────────────────
    let model = resolve_vision_model(config)?;
    info!("Using model {} via {}", config.model, config.provider_name);

    // ── Step 4: Documents ────────────────────────────────────────────────
    let documents = discover_documents(folder)?;
    if documents.is_empty() {
        return Err(TrawlerError::NoDocuments {
            path: folder.to_path_buf(),
        });
    }
    info!("Found {} PDF file(s)", documents.len());

    // ── Step 5: Batch ────────────────────────────────────────────────────
    let mut extractor = DocumentExtractor::new(resolve_rasterizer(config), model, config.pricing);
    if let Some(ref dir) = config.scratch_dir {
        extractor = extractor.with_scratch_dir(dir);
    }
    let report = BatchRunner::new(extractor)
        .concurrency(config.concurrency)
        .progress(config.progress_callback.clone())
        .cancellation(cancel)
        .run(&documents, &schema)
        .await;

    // ── Step 6: Single write ─────────────────────────────────────────────
    let output_path = write_report(folder, &report.results, &schema, &Local::now().naive_local())?;
    log_summary(&report.summary, &output_path);
    info!("Trawl finished in {:?}", start.elapsed());

    Ok(TrawlOutput {
        schema,
        report,
        output_path,
    })
}

/// Write [`Schema::example`] as the schema file of `folder`, creating the
/// folder if needed. An existing file is only replaced when `force` is set.
pub fn create_example(
    folder: impl AsRef<Path>,
    subject: &str,
    schema_file: &str,
    force: bool,
) -> Result<PathBuf, TrawlerError> {
    let folder = folder.as_ref();
    let path = folder.join(schema_file);
    if path.exists() && !force {
        return Err(TrawlerError::InvalidConfig(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }

    let write_failed = |source: std::io::Error| TrawlerError::OutputWriteFailed {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(folder).map_err(write_failed)?;
    let json = serde_json::to_string_pretty(&Schema::example(subject).to_value())
        .map_err(|e| TrawlerError::Serialization(e.to_string()))?;
    std::fs::write(&path, json + "\n").map_err(write_failed)?;

    info!("Example schema written to {}", path.display());
    Ok(path)
}

fn log_summary(summary: &BatchSummary, output_path: &Path) {
    info!("{}", "=".repeat(60));
    info!("PROCESSING SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Total resumes:      {}", summary.total_documents);
    info!("Successful:         {}", summary.succeeded);
    info!("Failed:             {}", summary.failed);
    info!("Total cost:         ${:.4}", summary.total_cost);
    info!("Average cost:       ${:.4}", summary.average_cost);
    info!("Input tokens:       {}", summary.total_input_tokens);
    info!("Output tokens:      {}", summary.total_output_tokens);
    info!("Output file:        {}", output_path.display());
}
