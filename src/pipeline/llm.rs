//! Vision model interaction: one request per document.
//!
//! All page images of a resume travel in a single user message together
//! with the extraction prompt, so the model sees the whole document at once.
//! Prompt wording lives in [`crate::prompts`]; this module only builds the
//! request, applies the timeout and reports token usage.
//!
//! There is no retry loop. A failed call fails the document, and the batch
//! moves on to the next one.

use crate::error::DocumentError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Raw model output plus the token counts the provider billed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Anything that can read a set of page images and answer a prompt.
///
/// The batch runner only talks to this trait, which keeps provider details
/// out of the pipeline and lets tests substitute a scripted model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn infer(&self, images: Vec<ImageData>, prompt: &str)
        -> Result<ModelReply, DocumentError>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl LlmVisionModel {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
            timeout,
        }
    }

    fn options(&self) -> CompletionOptions {
        build_options(self.temperature, self.max_tokens)
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    async fn infer(
        &self,
        images: Vec<ImageData>,
        prompt: &str,
    ) -> Result<ModelReply, DocumentError> {
        let start = Instant::now();
        let page_count = images.len();
        let messages = vec![ChatMessage::user_with_images(prompt, images)];
        let options = self.options();

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| DocumentError::ModelTimeout {
            secs: self.timeout.as_secs(),
        })?
        .map_err(|e| DocumentError::ModelFailed {
            detail: format!("{}", e),
        })?;

        debug!(
            "{} pages: {} input tokens, {} output tokens, {:?}",
            page_count,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(ModelReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Build `CompletionOptions` for an extraction request.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrawlConfig;

    #[test]
    fn build_options_defaults() {
        let config = TrawlConfig::default();
        let opts = build_options(config.temperature, config.max_tokens);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    struct Echo;

    #[async_trait]
    impl VisionModel for Echo {
        async fn infer(
            &self,
            images: Vec<ImageData>,
            prompt: &str,
        ) -> Result<ModelReply, DocumentError> {
            Ok(ModelReply {
                text: prompt.to_string(),
                input_tokens: images.len() as u64,
                output_tokens: 1,
            })
        }
    }

    #[tokio::test]
    async fn vision_model_is_object_safe() {
        let model: Arc<dyn VisionModel> = Arc::new(Echo);
        let reply = model
            .infer(vec![ImageData::new("AAAA", "image/png")], "hello")
            .await
            .unwrap();
        assert_eq!(reply.text, "hello");
        assert_eq!(reply.input_tokens, 1);
    }
}
