//! Pipeline stages for turning one resume PDF into a model reply.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering backend or model provider can be
//! swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ validate ──▶ encode ──▶ llm
//! (path)    (pdfium)   (decode)     (base64)   (vision model)
//! ```
//!
//! 1. [`input`]: discover documents in a folder and check each one
//! 2. [`render`]: rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`validate`]: drop page images that are missing, empty or undecodable
//! 4. [`encode`]: base64-wrap each page for the multimodal request body
//! 5. [`llm`]: one vision call per document; the only stage with
//!    network I/O

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
pub mod validate;
