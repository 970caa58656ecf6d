//! Summarisation entry points.
//!
//! [`Summarizer`] owns the four external capabilities (paper repository,
//! page extractor, token counter, text generator) plus an immutable
//! [`SummaryConfig`], and runs the pipeline once per call. The free functions
//! [`summarize`], [`summarize_sync`] and [`summarize_to_file`] build a
//! production `Summarizer` from a config and run it.
//!
//! Runs are independent: nothing is cached and no state is shared between
//! calls beyond the read-only capabilities.

use crate::config::{SummaryConfig, DEFAULT_MODEL};
use crate::error::PaperSummaryError;
use crate::output::{PaperSummary, SummaryStats};
use crate::pipeline::budget::{accumulate_pages, HeuristicTokenCounter, HfTokenCounter, TokenCounter};
use crate::pipeline::extract::{PageExtractor, PdfiumExtractor};
use crate::pipeline::fetch::{fetch_paper, ArxivClient, PaperRepository};
use crate::pipeline::llm::{GenerationOptions, ProviderGenerator, TextGenerator};
use crate::pipeline::sections::{parse_sections, render_markdown};
use crate::prompts::assemble_prompt;
use edgequake_llm::{AnthropicProvider, LLMProvider, OpenAIProvider, ProviderFactory, ProviderType};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A configured summarisation pipeline.
pub struct Summarizer {
    config: SummaryConfig,
    repository: Arc<dyn PaperRepository>,
    extractor: Arc<dyn PageExtractor>,
    counter: Arc<dyn TokenCounter>,
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    /// Build the production pipeline: arXiv, pdfium, the configured token
    /// counter and the resolved LLM provider.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, PaperSummaryError> {
        let repository = Arc::new(ArxivClient::new(config)?);
        let extractor = Arc::new(PdfiumExtractor::new(config.pdfium_library_path.clone()));
        let counter: Arc<dyn TokenCounter> = match config.tokenizer_path {
            Some(ref path) => Arc::new(HfTokenCounter::from_file(path)?),
            None => Arc::new(HeuristicTokenCounter),
        };
        let (provider, label) = resolve_provider(config)?;
        let generator = Arc::new(ProviderGenerator::new(provider, label));

        Ok(Self::with_capabilities(
            config, repository, extractor, counter, generator,
        ))
    }

    /// Build a pipeline from explicit capabilities.
    pub fn with_capabilities(
        config: &SummaryConfig,
        repository: Arc<dyn PaperRepository>,
        extractor: Arc<dyn PageExtractor>,
        counter: Arc<dyn TokenCounter>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config: config.clone(),
            repository,
            extractor,
            counter,
            generator,
        }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Run the full pipeline for one paper identifier.
    ///
    /// # Errors
    /// Any stage failure is returned unchanged; see [`PaperSummaryError::kind`].
    /// A lookup failure returns before the model is contacted.
    pub async fn summarize(&self, paper_id: &str) -> Result<PaperSummary, PaperSummaryError> {
        let total_start = Instant::now();
        info!("Summarising paper: {}", paper_id);

        // ── Step 1: Fetch ────────────────────────────────────────────────
        let fetch_start = Instant::now();
        let fetched = fetch_paper(self.repository.as_ref(), paper_id).await?;
        let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

        // ── Step 2: Extract ──────────────────────────────────────────────
        // `into_record` drops the temp dir before the result is inspected.
        let extract_start = Instant::now();
        let extracted = self.extractor.extract_pages(fetched.path()).await;
        let record = fetched.into_record();
        let pages = extracted?;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        info!("Extracted {} pages in {}ms", pages.len(), extract_duration_ms);

        // ── Step 3: Budget ───────────────────────────────────────────────
        let accumulated = accumulate_pages(&pages, self.config.token_budget, self.counter.as_ref());
        info!(
            "Using {}/{} pages ({} tokens, budget {})",
            accumulated.pages_used,
            accumulated.pages_total,
            accumulated.tokens,
            self.config.token_budget
        );

        // ── Step 4: Prompt ───────────────────────────────────────────────
        let prompt = assemble_prompt(&accumulated.text);

        // ── Step 5: Generate ─────────────────────────────────────────────
        let llm_start = Instant::now();
        let generation = self
            .generator
            .generate(&prompt, &GenerationOptions::SUMMARY)
            .await?;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        // ── Step 6: Render ───────────────────────────────────────────────
        let parsed = parse_sections(&generation.content);
        for w in &parsed.warnings {
            warn!("Model output for {}: {}", paper_id, w);
        }
        let front_matter = self.config.include_metadata.then_some(&record);
        let markdown = render_markdown(&record.title, &parsed, front_matter);

        let stats = SummaryStats {
            pages_total: accumulated.pages_total,
            pages_used: accumulated.pages_used,
            paper_tokens: accumulated.tokens,
            truncated: accumulated.is_truncated(),
            input_tokens: generation.prompt_tokens,
            output_tokens: generation.completion_tokens,
            fetch_duration_ms,
            extract_duration_ms,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!("Summary complete: {} in {}ms", paper_id, stats.total_duration_ms);

        Ok(PaperSummary {
            paper_id: paper_id.to_string(),
            sections: parsed.sections(),
            warnings: parsed.warnings,
            record,
            markdown,
            stats,
        })
    }
}

/// Summarise one paper with the production pipeline.
///
/// This is the primary entry point for the library.
///
/// ```rust,no_run
/// use paper_summary::{summarize, SummaryConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SummaryConfig::builder().provider_name("anthropic").build()?;
/// let summary = summarize("2309.05463", &config).await?;
/// println!("{}", summary.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn summarize(
    paper_id: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<PaperSummary, PaperSummaryError> {
    Summarizer::from_config(config)?
        .summarize(paper_id.as_ref())
        .await
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    paper_id: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<PaperSummary, PaperSummaryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PaperSummaryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(paper_id, config))
}

/// Summarise a paper and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn summarize_to_file(
    paper_id: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<PaperSummary, PaperSummaryError> {
    let summary = summarize(paper_id, config).await?;
    write_markdown(output_path.as_ref(), &summary.markdown).await?;
    Ok(summary)
}

/// Atomically write Markdown to `path`.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), PaperSummaryError> {
    let write_err = |source| PaperSummaryError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) - used as-is.
/// 2. **Named provider** (`config.provider_name`).
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER`, with `EDGEQUAKE_MODEL`
///    when set.
/// 4. **Anthropic** when an Anthropic key is in the config or `ANTHROPIC_API_KEY`.
/// 5. **OpenAI** when an OpenAI key is in the config or `OPENAI_API_KEY`.
///
/// Otherwise the provider is not configured. The library's mock provider is
/// never chosen implicitly. The environment is only read here, never written.
pub(crate) fn resolve_provider(
    config: &SummaryConfig,
) -> Result<(Arc<dyn LLMProvider>, String), PaperSummaryError> {
    resolve_provider_with(config, |key| {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    })
}

fn resolve_provider_with(
    config: &SummaryConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(Arc<dyn LLMProvider>, String), PaperSummaryError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        return named_provider(name, config.model.as_deref(), config);
    }

    if let Some(name) = env("EDGEQUAKE_LLM_PROVIDER") {
        let env_model = env("EDGEQUAKE_MODEL");
        let model = config.model.as_deref().or(env_model.as_deref());
        return named_provider(&name, model, config);
    }

    if let Some(key) = config
        .api_key("anthropic")
        .map(str::to_string)
        .or_else(|| env("ANTHROPIC_API_KEY"))
    {
        return Ok(anthropic(key, config.model.as_deref()));
    }

    if let Some(key) = config
        .api_key("openai")
        .map(str::to_string)
        .or_else(|| env("OPENAI_API_KEY"))
    {
        return Ok(openai(key, config.model.as_deref()));
    }

    Err(PaperSummaryError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: "No LLM provider configured.\n\
               Set ANTHROPIC_API_KEY or OPENAI_API_KEY (environment or env file), \
               or pass --provider."
            .to_string(),
    })
}

/// Build the provider called `name`. Keys from the config win; otherwise the
/// factory reads that provider's own environment variables.
fn named_provider(
    name: &str,
    model: Option<&str>,
    config: &SummaryConfig,
) -> Result<(Arc<dyn LLMProvider>, String), PaperSummaryError> {
    let provider_type =
        ProviderType::from_str(name).ok_or_else(|| PaperSummaryError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: "Unknown provider name".to_string(),
        })?;

    match provider_type {
        ProviderType::Anthropic => {
            if let Some(key) = config.api_key("anthropic") {
                return Ok(anthropic(key.to_string(), model));
            }
        }
        ProviderType::OpenAI => {
            if let Some(key) = config.api_key("openai") {
                return Ok(openai(key.to_string(), model));
            }
        }
        _ => {}
    }

    // Only Anthropic gets our default model; the rest keep their own.
    let model = match provider_type {
        ProviderType::Anthropic => Some(model.unwrap_or(DEFAULT_MODEL)),
        _ => model,
    };

    let (provider, _embedding) =
        ProviderFactory::create_with_model(provider_type, model).map_err(|e| {
            PaperSummaryError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: e.to_string(),
            }
        })?;
    Ok((provider, name.to_string()))
}

fn anthropic(key: String, model: Option<&str>) -> (Arc<dyn LLMProvider>, String) {
    let provider = AnthropicProvider::new(key).with_model(model.unwrap_or(DEFAULT_MODEL));
    (Arc::new(provider), "anthropic".to_string())
}

fn openai(key: String, model: Option<&str>) -> (Arc<dyn LLMProvider>, String) {
    let mut provider = OpenAIProvider::new(key);
    if let Some(model) = model {
        provider = provider.with_model(model);
    }
    (Arc::new(provider), "openai".to_string())
}
