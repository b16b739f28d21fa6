//! Page image validation.
//!
//! Each rendered page is checked on its own: the file must exist, be
//! non-empty and decode as an image. A bad page is dropped with a warning;
//! only a document with no valid page at all fails.

use image::ImageReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A page image that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub format: image::ImageFormat,
}

/// Why a page image was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRejection {
    Missing,
    Empty,
    Undecodable(String),
}

impl std::fmt::Display for PageRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageRejection::Missing => f.write_str("file does not exist"),
            PageRejection::Empty => f.write_str("file is empty (0 bytes)"),
            PageRejection::Undecodable(e) => write!(f, "failed to open image: {e}"),
        }
    }
}

/// Validate a single page image.
pub fn validate_page(path: &Path) -> Result<ValidPage, PageRejection> {
    let meta = std::fs::metadata(path).map_err(|_| PageRejection::Missing)?;
    if meta.len() == 0 {
        return Err(PageRejection::Empty);
    }

    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| PageRejection::Undecodable(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| PageRejection::Undecodable("unrecognised image format".into()))?;
    let image = reader
        .decode()
        .map_err(|e| PageRejection::Undecodable(e.to_string()))?;

    Ok(ValidPage {
        path: path.to_path_buf(),
        width: image.width(),
        height: image.height(),
        size_bytes: meta.len(),
        format,
    })
}

/// Validate every page, keeping page order and dropping the invalid ones.
pub fn validate_pages(paths: &[PathBuf]) -> Vec<ValidPage> {
    let valid: Vec<ValidPage> = paths
        .iter()
        .enumerate()
        .filter_map(|(idx, path)| match validate_page(path) {
            Ok(page) => {
                info!(
                    "  Page {}: {}x{}px, {} bytes, {:?}",
                    idx + 1,
                    page.width,
                    page.height,
                    page.size_bytes,
                    page.format
                );
                Some(page)
            }
            Err(reason) => {
                warn!("  Page {}: {}", idx + 1, reason);
                None
            }
        })
        .collect();

    info!("{}/{} images validated successfully", valid.len(), paths.len());
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([255, 255, 255])).save(path).unwrap();
    }

    #[test]
    fn accepts_decodable_image() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("page_1.png");
        write_png(&p, 40, 60);
        let page = validate_page(&p).unwrap();
        assert_eq!((page.width, page.height), (40, 60));
        assert_eq!(page.format, image::ImageFormat::Png);
        assert!(page.size_bytes > 0);
    }

    #[test]
    fn rejects_missing_empty_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            validate_page(&dir.path().join("nope.png")),
            Err(PageRejection::Missing)
        );

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(validate_page(&empty), Err(PageRejection::Empty));

        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"\x89PNG\r\n\x1a\nthis is not a png").unwrap();
        assert!(matches!(
            validate_page(&corrupt),
            Err(PageRejection::Undecodable(_))
        ));
    }

    #[test]
    fn drops_invalid_pages_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("cv_1.png");
        let b = dir.path().join("cv_2.png");
        let c = dir.path().join("cv_3.png");
        write_png(&a, 10, 10);
        std::fs::write(&b, b"").unwrap();
        write_png(&c, 20, 20);

        let valid = validate_pages(&[a.clone(), b, c.clone()]);
        let paths: Vec<&PathBuf> = valid.iter().map(|p| &p.path).collect();
        assert_eq!(paths, vec![&a, &c]);
    }
}
