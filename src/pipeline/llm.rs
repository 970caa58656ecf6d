//! Model invocation: send the assembled prompt and wait for one response.
//!
//! The pipeline talks to the model through [`TextGenerator`] so tests and
//! embedders can substitute any backend. [`ProviderGenerator`] is the
//! production implementation over an `edgequake-llm` provider. One request,
//! no streaming, no retry: a failure comes back as
//! [`PaperSummaryError::LlmApiError`].

use crate::error::PaperSummaryError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sampling temperature for every summary request.
pub const SUMMARY_TEMPERATURE: f32 = 0.0;

/// Output token ceiling for every summary request.
pub const SUMMARY_MAX_TOKENS: usize = 1024;

/// Generation parameters for a summary request.
///
/// The pipeline always sends [`GenerationOptions::SUMMARY`]; the type exists
/// so a [`TextGenerator`] can see what it was asked for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl GenerationOptions {
    /// Deterministic output, at most 1024 tokens.
    pub const SUMMARY: Self = Self {
        temperature: SUMMARY_TEMPERATURE,
        max_tokens: SUMMARY_MAX_TOKENS,
    };
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::SUMMARY
    }
}

/// One completed model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can turn a prompt into a single text response.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, PaperSummaryError>;
}

/// [`TextGenerator`] over an `edgequake-llm` provider.
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderGenerator {
    /// `label` names the provider in error messages.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, PaperSummaryError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let completion = build_options(options);

        let response = self
            .provider
            .chat(&messages, Some(&completion))
            .await
            .map_err(|e| PaperSummaryError::LlmApiError {
                provider: self.label.clone(),
                message: e.to_string(),
            })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(Generation {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the generation parameters.
fn build_options(options: &GenerationOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        ..Default::default()
    }
}
