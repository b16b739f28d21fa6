//! Input resolution: find the resumes in a folder and check each one before
//! any rendering work is spent on it.
//!
//! Discovery is deterministic: files whose extension is `pdf` in any case are
//! collected, deduplicated and sorted lexicographically by identifier, so two runs
//! over the same folder process documents in the same order.

use crate::error::{DocumentError, TrawlerError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stable identifier of a document: its file stem.
pub fn document_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Sort and deduplicate document paths into processing order: by
/// [`document_id`], then by path for documents sharing a stem.
pub fn order_documents(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by_cached_key(|p| (document_id(p), p.clone()));
    paths.dedup();
    paths
}

/// List the PDF files directly inside `dir`, in processing order.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, TrawlerError> {
    if !dir.exists() {
        return Err(TrawlerError::InputFolderNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(TrawlerError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        TrawlerError::Internal(format!("Failed to list {}: {}", dir.display(), e))
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            TrawlerError::Internal(format!("Failed to list {}: {}", dir.display(), e))
        })?;
        let path = entry.path();
        if path.is_file() && is_pdf(&path) {
            found.push(path);
        }
    }

    let documents = order_documents(found);
    for doc in &documents {
        let size = std::fs::metadata(doc).map(|m| m.len()).unwrap_or(0);
        info!("  {} ({} bytes)", doc.display(), size);
    }
    Ok(documents)
}

/// Check that a document exists and is non-empty. Returns its size in bytes.
pub fn check_document(path: &Path) -> Result<u64, DocumentError> {
    let meta = std::fs::metadata(path).map_err(|_| DocumentError::NotFound {
        path: path.to_path_buf(),
    })?;
    if !meta.is_file() {
        return Err(DocumentError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if meta.len() == 0 {
        return Err(DocumentError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    debug!("Document {} is {} bytes", path.display(), meta.len());
    Ok(meta.len())
}
