//! PDF rasterisation: render every page of a document to an image file.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`rasterize_document`] moves the work onto tokio's blocking pool so the
//! async workers never stall on CPU-heavy rendering.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary: a scanned A3 resume at 150 DPI is far larger than a US
//! Letter export. `max_rendered_pixels` caps the longest edge regardless of
//! physical size, keeping memory bounded and images inside provider limits.

use crate::config::RasterConfig;
use crate::error::DocumentError;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a document into an ordered sequence of page image files.
///
/// Implementations write into `output_dir`, which is exclusive to one
/// document, and name files `{prefix}_{page}.{ext}`. An empty `Ok` vector
/// means the document produced no pages.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<Vec<PathBuf>, DocumentError>;
}

/// Rasterizer backed by pdfium.
///
/// The library location comes from [`RasterConfig::pdfium_library_dir`],
/// fixed at construction.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    config: RasterConfig,
}

impl PdfiumRasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    fn bind(&self) -> Result<Pdfium, DocumentError> {
        let bindings = match &self.config.pdfium_library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| DocumentError::RasterizationFailed {
            detail: format!("failed to bind to pdfium library: {:?}", e),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<Vec<PathBuf>, DocumentError> {
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            DocumentError::RasterizationFailed {
                detail: format!("{:?}", e),
            }
        })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let max_pixels = self.config.max_rendered_pixels as i32;
        let render_config = PdfRenderConfig::new()
            .set_target_width(max_pixels)
            .set_maximum_height(max_pixels);

        let mut written = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            let bitmap = match page.render_with_config(&render_config) {
                Ok(b) => b,
                Err(e) => {
                    warn!("Page {}: render failed: {:?}", page_num, e);
                    continue;
                }
            };
            let image = bitmap.as_image();
            let path = output_dir.join(format!("{}_{}.png", prefix, page_num));
            match image.save_with_format(&path, ImageFormat::Png) {
                Ok(()) => {
                    debug!(
                        "Rendered page {} → {}x{} px at {}",
                        page_num,
                        image.width(),
                        image.height(),
                        path.display()
                    );
                    written.push(path);
                }
                Err(e) => warn!("Page {}: failed to save image: {}", page_num, e),
            }
        }

        Ok(written)
    }
}

/// Run `rasterizer` on the blocking pool.
pub async fn rasterize_document(
    rasterizer: &Arc<dyn Rasterizer>,
    pdf_path: &Path,
    output_dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>, DocumentError> {
    let rasterizer = Arc::clone(rasterizer);
    let pdf = pdf_path.to_path_buf();
    let out = output_dir.to_path_buf();
    let prefix = prefix.to_string();

    tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf, &out, &prefix))
        .await
        .map_err(|e| DocumentError::Internal(format!("Render task panicked: {}", e)))?
}
