//! Single-document extraction.
//!
//! [`DocumentExtractor::extract`] drives one resume through every pipeline
//! stage and always returns an [`ExtractionResult`]; a stage failure becomes
//! a `failure` result instead of an error, so one bad file never aborts the
//! batch.
//!
//! ```text
//! check ──▶ rasterize ──▶ validate ──▶ encode ──▶ infer ──▶ coerce
//! ```
//!
//! Token usage is attached as soon as the model has been billed: a reply
//! that cannot be parsed still reports the tokens and cost it consumed.

use crate::coerce::{coerce_response, FieldValues};
use crate::error::DocumentError;
use crate::output::{ExtractionResult, Usage};
use crate::pipeline::encode::encode_pages;
use crate::pipeline::input::{check_document, document_id};
use crate::pipeline::llm::VisionModel;
use crate::pipeline::render::{rasterize_document, Rasterizer};
use crate::pipeline::validate::validate_pages;
use crate::prompts::build_extraction_prompt;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info};

/// Token prices in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Pricing {
    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of one call in USD.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }

    pub fn is_valid(&self) -> bool {
        [self.input_per_million, self.output_per_million]
            .iter()
            .all(|p| p.is_finite() && *p >= 0.0)
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(3.0, 15.0)
    }
}

/// A stage failure plus whatever usage had been incurred when it happened.
struct StageFailure {
    error: DocumentError,
    usage: Usage,
}

impl From<DocumentError> for StageFailure {
    fn from(error: DocumentError) -> Self {
        Self {
            error,
            usage: Usage::default(),
        }
    }
}

/// Where a document's page images live while it is being processed.
enum Scratch {
    /// Removed when dropped, on success, failure and cancellation alike.
    Owned(TempDir),
    /// Inside a caller-supplied directory; left in place.
    Borrowed(PathBuf),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Scratch::Owned(dir) => dir.path(),
            Scratch::Borrowed(path) => path,
        }
    }
}

/// Runs the per-document pipeline against a rasterizer and a vision model.
#[derive(Clone)]
pub struct DocumentExtractor {
    rasterizer: Arc<dyn Rasterizer>,
    model: Arc<dyn VisionModel>,
    pricing: Pricing,
    scratch_dir: Option<PathBuf>,
}

impl DocumentExtractor {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        model: Arc<dyn VisionModel>,
        pricing: Pricing,
    ) -> Self {
        Self {
            rasterizer,
            model,
            pricing,
            scratch_dir: None,
        }
    }

    /// Render page images under `dir/<file name>/` instead of a temporary
    /// directory. The images are kept after extraction.
    ///
    /// The subdirectory is keyed on the full file name, not the identifier:
    /// `a.pdf` and `a.PDF` share a stem but must not share page images.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Extract one document. Never fails; problems become a `failure` result.
    pub async fn extract(&self, path: &Path, schema: &Schema) -> ExtractionResult {
        let id = document_id(path);
        let start = Instant::now();
        info!("Processing {}", id);

        match self.run(path, &id, schema).await {
            Ok((values, usage)) => {
                info!(
                    "✓ {}: {} pages, {} in / {} out tokens, ${:.4}, {:?}",
                    id,
                    usage.pages_processed,
                    usage.input_tokens,
                    usage.output_tokens,
                    usage.cost,
                    start.elapsed()
                );
                ExtractionResult::success(id, values, usage)
            }
            Err(StageFailure { error, usage }) => {
                error!("✗ {}: {}", id, error);
                ExtractionResult::failure(id, schema, &error, usage)
            }
        }
    }

    async fn run(
        &self,
        path: &Path,
        id: &str,
        schema: &Schema,
    ) -> Result<(FieldValues, Usage), StageFailure> {
        check_document(path)?;

        let scratch = self.scratch_for(path)?;
        let rendered = rasterize_document(&self.rasterizer, path, scratch.path(), id).await?;
        if rendered.is_empty() {
            return Err(DocumentError::NoPages.into());
        }
        info!("{}: rendered {} page(s)", id, rendered.len());

        let valid = validate_pages(&rendered);
        if valid.is_empty() {
            return Err(DocumentError::NoValidPages {
                rejected: rendered.len(),
            }
            .into());
        }

        let images = encode_pages(&valid);
        if images.is_empty() {
            return Err(DocumentError::NoEncodablePages {
                attempted: valid.len(),
            }
            .into());
        }

        let pages_processed = images.len();
        let prompt = build_extraction_prompt(schema.subject(), schema.fields());
        debug!("{}: sending {} page(s), prompt {} chars", id, pages_processed, prompt.len());

        let reply = self.model.infer(images, &prompt).await?;
        let usage = Usage {
            pages_processed,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            cost: self.pricing.cost(reply.input_tokens, reply.output_tokens),
        };

        let coercion = coerce_response(&reply.text, schema);
        match coercion.parse_error {
            None => Ok((coercion.values, usage)),
            Some(detail) => Err(StageFailure {
                error: DocumentError::UnparsableResponse { detail },
                usage,
            }),
        }
        // `scratch` drops here, removing an owned directory
    }

    fn scratch_for(&self, path: &Path) -> Result<Scratch, DocumentError> {
        match &self.scratch_dir {
            Some(root) => {
                let dir = match path.file_name() {
                    Some(name) => root.join(name),
                    None => root.join(document_id(path)),
                };
                std::fs::create_dir_all(&dir).map_err(|e| {
                    DocumentError::Internal(format!(
                        "Failed to create scratch directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
                Ok(Scratch::Borrowed(dir))
            }
            None => tempfile::Builder::new()
                .prefix("talent_trawler_")
                .tempdir()
                .map(Scratch::Owned)
                .map_err(|e| {
                    DocumentError::Internal(format!("Failed to create temp directory: {}", e))
                }),
        }
    }
}
