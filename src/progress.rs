//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::TrawlConfigBuilder::progress_callback`] to receive events
//! as the batch runner works through the documents.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal progress bar, a log, or a
//! channel of their own without the library knowing how the host
//! application communicates. The trait is `Send + Sync` because documents
//! may be extracted concurrently.
//!
//! # Example
//!
//! ```rust
//! use talent_trawler::{BatchProgressCallback, TrawlConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, document_id: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} done: {}", index + 1, total, document_id);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = TrawlConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is the zero-based position of the document
/// in the batch.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_document_start`, `on_document_complete` and
/// `on_document_error` may be called concurrently and out of order.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first document is started.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    fn on_document_start(&self, index: usize, total: usize, document_id: &str) {
        let _ = (index, total, document_id);
    }

    /// Called when a document finished with a `success` outcome.
    fn on_document_complete(&self, index: usize, total: usize, document_id: &str) {
        let _ = (index, total, document_id);
    }

    /// Called when a document finished with a `failure` outcome.
    fn on_document_error(&self, index: usize, total: usize, document_id: &str, error: &str) {
        let _ = (index, total, document_id, error);
    }

    /// Called once after every document has a result.
    fn on_batch_complete(&self, total_documents: usize, succeeded: usize) {
        let _ = (total_documents, succeeded);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TrawlConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
