//! Configuration types for a resume trawl.
//!
//! All batch behaviour is controlled through [`TrawlConfig`], built via its
//! [`TrawlConfigBuilder`]. The config is resolved once at startup and then
//! only read; in particular the rasterizer's library location lives in
//! [`RasterConfig`] and is handed to the rasterizer at construction instead of
//! being published through process environment variables.

use crate::error::TrawlerError;
use crate::extract::Pricing;
use crate::pipeline::llm::VisionModel;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model: strong vision model with reliable JSON output.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Default provider name passed to `edgequake_llm::ProviderFactory`.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Name of the schema file expected inside the input folder.
pub const DEFAULT_SCHEMA_FILE: &str = "config.json";

/// Page rasterisation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Longest edge of a rendered page in pixels. Default: 2000.
    ///
    /// Resume pages are mostly text; 2000 px keeps small print legible while
    /// staying well under provider image-size limits.
    pub max_rendered_pixels: u32,

    /// Directory holding the pdfium shared library. `None` binds to the
    /// system library search path.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            pdfium_library_dir: None,
        }
    }
}

/// Configuration for a batch of resume extractions.
///
/// # Example
/// ```rust
/// use talent_trawler::TrawlConfig;
///
/// let config = TrawlConfig::builder()
///     .model("claude-sonnet-4-5-20250929")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TrawlConfig {
    /// LLM model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// LLM provider name (e.g. "anthropic", "openai", "gemini", "ollama").
    pub provider_name: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and skips the credential check.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed vision model. Takes precedence over `provider`.
    pub vision_model: Option<Arc<dyn VisionModel>>,

    /// Pre-constructed rasterizer. Default: pdfium with [`Self::raster`].
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per document. Default: 4096.
    pub max_tokens: usize,

    /// Token prices used for cost accounting.
    pub pricing: Pricing,

    /// Documents extracted at the same time. Default: 1 (sequential).
    ///
    /// Output order always equals input order regardless of this value.
    pub concurrency: usize,

    /// Per-model-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Caller-owned scratch directory for page images. When `None` each
    /// document gets a temporary directory that is removed on every exit path.
    pub scratch_dir: Option<PathBuf>,

    /// Schema file name inside the input folder. Default: `config.json`.
    pub schema_file: String,

    /// Rasterisation settings.
    pub raster: RasterConfig,

    /// Per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TrawlConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            provider: None,
            vision_model: None,
            rasterizer: None,
            temperature: 0.1,
            max_tokens: 4096,
            pricing: Pricing::default(),
            concurrency: 1,
            api_timeout_secs: 120,
            scratch_dir: None,
            schema_file: DEFAULT_SCHEMA_FILE.to_string(),
            raster: RasterConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TrawlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrawlConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("vision_model", &self.vision_model.as_ref().map(|_| "<dyn VisionModel>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pricing", &self.pricing)
            .field("concurrency", &self.concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("scratch_dir", &self.scratch_dir)
            .field("schema_file", &self.schema_file)
            .field("raster", &self.raster)
            .finish()
    }
}

impl TrawlConfig {
    /// Create a new builder for `TrawlConfig`.
    pub fn builder() -> TrawlConfigBuilder {
        TrawlConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TrawlConfig`].
#[derive(Debug)]
pub struct TrawlConfigBuilder {
    config: TrawlConfig,
}

impl TrawlConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn pricing(mut self, pricing: Pricing) -> Self {
        self.config.pricing = pricing;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn schema_file(mut self, name: impl Into<String>) -> Self {
        self.config.schema_file = name.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.raster.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.raster.pdfium_library_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TrawlConfig, TrawlerError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(TrawlerError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(TrawlerError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if !c.pricing.is_valid() {
            return Err(TrawlerError::InvalidConfig(format!(
                "Token prices must be finite and non-negative, got {:?}",
                c.pricing
            )));
        }
        if c.model.trim().is_empty() {
            return Err(TrawlerError::InvalidConfig("Model id must not be empty".into()));
        }
        if c.schema_file.trim().is_empty() {
            return Err(TrawlerError::InvalidConfig("Schema file name must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TrawlConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.provider_name, "anthropic");
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.schema_file, "config.json");
        assert_eq!(c.raster.max_rendered_pixels, 2000);
        assert!(c.scratch_dir.is_none());
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = TrawlConfig::builder()
            .concurrency(0)
            .temperature(9.0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.raster.max_rendered_pixels, 100);

        assert!(TrawlConfig::builder().max_tokens(0).build().is_err());
        assert!(TrawlConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(TrawlConfig::builder()
            .pricing(Pricing::new(-1.0, 15.0))
            .build()
            .is_err());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", TrawlConfig::default());
        assert!(s.contains("TrawlConfig"));
        assert!(s.contains("provider: None"));
    }
}
