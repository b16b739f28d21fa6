//! # talent-trawler
//!
//! Extract structured, typed fields from resume PDFs using vision language
//! models.
//!
//! ## Why this crate?
//!
//! Resumes come in every layout imaginable: two columns, sidebars, tables,
//! icons instead of headings. Text extraction scrambles reading order, so
//! this crate rasterises each page and lets a vision model read the document
//! the way a recruiter would. A user-defined question schema turns the
//! model's answer into one typed row per candidate.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder/
//!  │
//!  ├─ 1. Schema    load and validate config.json
//!  ├─ 2. Input     discover *.pdf, check each file
//!  ├─ 3. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 4. Validate  drop unreadable page images
//!  ├─ 5. Encode    page file → base64 ImageData
//!  ├─ 6. VLM       one call per resume, all pages at once
//!  ├─ 7. Coerce    fenced / sloppy JSON → typed, sanitised values
//!  └─ 8. Output    one CSV or JSON file for the whole batch
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use talent_trawler::{trawl_folder, TrawlConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ANTHROPIC_API_KEY and ./resumes/config.json
//!     let config = TrawlConfig::default();
//!     let output = trawl_folder("resumes", &config).await?;
//!     eprintln!(
//!         "{} of {} resumes extracted, ${:.4} → {}",
//!         output.report.summary.succeeded,
//!         output.report.summary.total_documents,
//!         output.report.summary.total_cost,
//!         output.output_path.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `talent-trawler` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! talent-trawler = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod coerce;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sanitize;
pub mod schema;
pub mod trawl;
pub mod writer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{BatchReport, BatchRunner};
pub use coerce::{coerce_response, Coercion, FieldValue, FieldValues, FieldWarning};
pub use config::{RasterConfig, TrawlConfig, TrawlConfigBuilder};
pub use error::{DocumentError, SchemaError, TrawlerError};
pub use extract::{DocumentExtractor, Pricing};
pub use output::{BatchSummary, ExtractionResult, Outcome, Usage};
pub use pipeline::llm::{LlmVisionModel, ModelReply, VisionModel};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::build_extraction_prompt;
pub use sanitize::sanitize;
pub use schema::{FieldSpec, FieldType, OutputMode, Schema};
pub use trawl::{
    create_example, credential_env_var, trawl_folder, trawl_folder_with_cancellation, TrawlOutput,
};
pub use writer::write_report;
