//! Image encoding: validated page file → base64 payload wrapped in `ImageData`.
//!
//! Vision APIs (Anthropic, OpenAI, Gemini) accept images as base64 data
//! embedded in the JSON request body. The rendered file is sent as-is; it
//! was already written losslessly by the rasterizer, so re-encoding would
//! only cost CPU.

use crate::pipeline::validate::ValidPage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use std::io;
use tracing::{debug, warn};

/// MIME type for the image formats a rasterizer may produce.
pub fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "image/png",
    }
}

/// Encode one page file for the vision model.
///
/// `detail: "high"` asks tiling models for the full tile budget; without it
/// small print such as contact details and dates is lost.
pub fn encode_page(page: &ValidPage) -> io::Result<ImageData> {
    let bytes = std::fs::read(&page.path)?;
    let b64 = STANDARD.encode(&bytes);
    debug!(
        "Encoded {} → {} bytes base64",
        page.path.display(),
        b64.len()
    );
    Ok(ImageData::new(b64, mime_type(page.format)).with_detail("high"))
}

/// Encode every page, dropping the ones that cannot be read.
pub fn encode_pages(pages: &[ValidPage]) -> Vec<ImageData> {
    pages
        .iter()
        .filter_map(|page| match encode_page(page) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to encode {}: {}", page.path.display(), e);
                None
            }
        })
        .collect()
}
