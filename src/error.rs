//! Error types for the talent-trawler library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`TrawlerError`]: **fatal**, the batch cannot start at all (invalid
//!   schema, missing API key, no input documents). Returned as
//!   `Err(TrawlerError)` from [`crate::trawl::trawl_folder`] before any
//!   document is processed, and the only path that produces no output file.
//!
//! * [`SchemaError`]: the specific reason a schema source was rejected.
//!   Wrapped by [`TrawlerError::Schema`].
//!
//! * [`DocumentError`]: **non-fatal**, a single document failed at one
//!   pipeline stage. It is converted into a `Failure`
//!   [`crate::output::ExtractionResult`] and never escalates; every other
//!   document in the batch is unaffected.
//!
//! Field-level coercion problems are not errors at all; they are reported as
//! [`crate::coerce::FieldWarning`] values and the field degrades to null.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the talent-trawler library.
///
/// Per-document failures use [`DocumentError`] and are stored in
/// [`crate::output::ExtractionResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TrawlerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input folder does not exist.
    #[error("Input folder does not exist: '{path}'")]
    InputFolderNotFound { path: PathBuf },

    /// The input path exists but is not a directory.
    #[error("Input path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// No PDF documents were found to process.
    #[error("No PDF files found in '{path}'")]
    NoDocuments { path: PathBuf },

    // ── Schema errors ─────────────────────────────────────────────────────
    /// The question schema is missing or invalid.
    #[error("Invalid schema: {0}\nTip: run with --create-example <FOLDER> to generate a sample config.json")]
    Schema(#[from] SchemaError),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The API key for the selected provider is not set.
    #[error("{env_var} not found in environment variables (provider '{provider}').\nSet it in a .env file or export it.")]
    MissingCredential { provider: String, env_var: String },

    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Results could not be serialised.
    #[error("Failed to serialise results: {0}")]
    Serialization(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a schema source was rejected.
///
/// Validation stops at the first violation, so each value names exactly one
/// field or constraint the user has to fix.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("schema must be a JSON object")]
    NotAnObject,

    #[error("missing required field: {key}")]
    MissingKey { key: &'static str },

    #[error("'{key}' must be a string")]
    NotAString { key: &'static str },

    #[error("'questions' must be a list")]
    QuestionsNotAList,

    #[error("'questions' list cannot be empty")]
    EmptyQuestions,

    #[error("question {index} must be an object")]
    QuestionNotAnObject { index: usize },

    #[error("question {index} missing required field: {key}")]
    QuestionMissingKey { index: usize, key: &'static str },

    #[error("question {index}: '{key}' must be a non-empty string")]
    QuestionInvalidValue { index: usize, key: &'static str },

    #[error("duplicate field name: {field}")]
    DuplicateField { field: String },

    #[error("invalid type '{value}' for field '{field}'. Must be one of: string, int, float, bool")]
    InvalidType { field: String, value: String },

    #[error("invalid output_mode: '{value}'. Must be 'tabular' or 'structured'")]
    InvalidOutputMode { value: String },
}

/// A non-fatal error for a single document.
///
/// The `Display` text becomes the `error_message` of the document's
/// `Failure` result, so each variant names the stage that gave up.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    #[error("PDF file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("PDF file is empty: {path}")]
    EmptyFile { path: PathBuf },

    #[error("PDF conversion failed: {detail}")]
    RasterizationFailed { detail: String },

    #[error("PDF conversion produced no pages")]
    NoPages,

    #[error("No valid images generated ({rejected} page(s) rejected)")]
    NoValidPages { rejected: usize },

    #[error("Image encoding failed for all {attempted} page(s)")]
    NoEncodablePages { attempted: usize },

    #[error("API error: {detail}")]
    ModelFailed { detail: String },

    #[error("API call timed out after {secs}s")]
    ModelTimeout { secs: u64 },

    #[error("Unparsable model response: {detail}")]
    UnparsableResponse { detail: String },

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}
