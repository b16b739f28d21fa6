//! Batch orchestration: one [`ExtractionResult`] per input document, in
//! input order.
//!
//! Documents may be extracted concurrently (`concurrency > 1`), but
//! `buffered` yields results in submission order, so the output never depends
//! on which model call happened to return first. The summary is computed
//! only after every document has a result.
//!
//! ## Cancellation
//!
//! Cancelling the [`CancellationToken`] stops the batch without losing work:
//! finished documents keep their results, in-flight and not-yet-started ones
//! become `failure` results with the reason "Processing cancelled". The
//! report is still complete, so the caller can write it as usual.

use crate::error::DocumentError;
use crate::extract::DocumentExtractor;
use crate::output::{BatchSummary, ExtractionResult, Usage};
use crate::pipeline::input::document_id;
use crate::progress::ProgressCallback;
use crate::schema::Schema;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a finished (or cancelled) batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<ExtractionResult>,
    pub summary: BatchSummary,
    /// Whether the batch was cancelled before every document ran to completion.
    pub cancelled: bool,
}

/// Drives a [`DocumentExtractor`] over a list of documents.
pub struct BatchRunner {
    extractor: DocumentExtractor,
    concurrency: usize,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(extractor: DocumentExtractor) -> Self {
        Self {
            extractor,
            concurrency: 1,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn progress(mut self, cb: Option<ProgressCallback>) -> Self {
        self.progress = cb;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Extract every document. Always returns one result per input path.
    pub async fn run(&self, documents: &[PathBuf], schema: &Schema) -> BatchReport {
        let total = documents.len();
        info!(
            "Processing {} document(s), concurrency {}",
            total, self.concurrency
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let results: Vec<ExtractionResult> = stream::iter(
            documents
                .iter()
                .enumerate()
                .map(|(index, path)| self.run_one(index, total, path, schema)),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let summary = BatchSummary::from_results(&results);
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(
                "Batch cancelled: {} of {} document(s) completed",
                summary.succeeded, total
            );
        }
        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, summary.succeeded);
        }

        BatchReport {
            results,
            summary,
            cancelled,
        }
    }

    async fn run_one(
        &self,
        index: usize,
        total: usize,
        path: &Path,
        schema: &Schema,
    ) -> ExtractionResult {
        let id = document_id(path);
        let result = if self.cancel.is_cancelled() {
            cancelled(&id, schema)
        } else {
            info!("[{}/{}] {}", index + 1, total, path.display());
            if let Some(ref cb) = self.progress {
                cb.on_document_start(index, total, &id);
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("{}: cancelled while in flight", id);
                    cancelled(&id, schema)
                }
                result = self.extractor.extract(path, schema) => result,
            }
        };

        if let Some(ref cb) = self.progress {
            match result.error_message() {
                None => cb.on_document_complete(index, total, &id),
                Some(e) => cb.on_document_error(index, total, &id, e),
            }
        }
        result
    }
}

fn cancelled(id: &str, schema: &Schema) -> ExtractionResult {
    ExtractionResult::failure(id, schema, &DocumentError::Cancelled, Usage::default())
}
