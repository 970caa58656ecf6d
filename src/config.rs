//! Configuration types for paper summarisation.
//!
//! Every knob lives in [`SummaryConfig`], built once at startup through
//! [`SummaryConfigBuilder`] and then only ever borrowed. Values can come from
//! three layers, lowest precedence first: built-in defaults, a `.env`-style
//! file, and explicit builder calls (the CLI maps its flags onto those).
//!
//! The env file is read into the builder directly, API keys included. Nothing
//! here writes to the process environment, so two configs loaded from
//! different files can live side by side in one process.
//!
//! Generation parameters are not configurable; see
//! [`crate::pipeline::llm::GenerationOptions::SUMMARY`].

use crate::error::PaperSummaryError;
use edgequake_llm::LLMProvider;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Total token ceiling for the paper text sent to the model.
pub const DEFAULT_TOKEN_BUDGET: usize = 30_000;

/// Timeout for the lookup and the PDF download, in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Anthropic model used when no model is configured. Other providers fall
/// back to their own default model.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// arXiv Atom query endpoint.
pub const DEFAULT_ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Configuration for one summarisation pipeline.
///
/// # Example
/// ```rust
/// use paper_summary::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .token_budget(20_000)
///     .model("claude-sonnet-4-20250514")
///     .build()
///     .unwrap();
/// assert_eq!(config.token_budget, 20_000);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Ceiling on the measured size of accumulated paper text. Default: 30000.
    ///
    /// Pages are added whole; the page that crosses the ceiling is still
    /// included, so the final total can exceed this by up to one page.
    pub token_budget: usize,

    /// LLM model identifier. If None, Anthropic uses [`DEFAULT_MODEL`] and
    /// other providers their own default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "anthropic", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// API keys by provider name (`"anthropic"`, `"openai"`), usually read
    /// from the env file. Consulted before the process environment.
    pub api_keys: BTreeMap<String, String>,

    /// HuggingFace `tokenizer.json` used to measure page size.
    ///
    /// When unset, a characters-per-token estimate is used instead.
    pub tokenizer_path: Option<PathBuf>,

    /// arXiv Atom API endpoint. Default: [`DEFAULT_ARXIV_API_URL`].
    pub arxiv_api_url: String,

    /// Timeout for the lookup and the PDF download, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Directory containing the pdfium shared library. If None, binds to the
    /// system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Prepend YAML front matter (id, title, authors, published). Default: false.
    pub include_metadata: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
            model: None,
            provider_name: None,
            provider: None,
            api_keys: BTreeMap::new(),
            tokenizer_path: None,
            arxiv_api_url: DEFAULT_ARXIV_API_URL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            pdfium_library_path: None,
            include_metadata: false,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("token_budget", &self.token_budget)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_keys", &self.api_keys.keys().collect::<Vec<_>>())
            .field("tokenizer_path", &self.tokenizer_path)
            .field("arxiv_api_url", &self.arxiv_api_url)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("include_metadata", &self.include_metadata)
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// API key configured for `provider`, if any.
    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.api_keys.get(provider).map(String::as_str)
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn token_budget(mut self, tokens: usize) -> Self {
        self.config.token_budget = tokens;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    /// Set the API key for one provider. Empty keys are ignored.
    pub fn api_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.config.api_keys.insert(provider.into(), key);
        }
        self
    }

    pub fn tokenizer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tokenizer_path = Some(path.into());
        self
    }

    pub fn arxiv_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.arxiv_api_url = url.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    /// Apply `KEY=VALUE` pairs read from an env file.
    ///
    /// Returns `Ok(self)` unchanged when the file does not exist; a file that
    /// exists but cannot be parsed is an error.
    pub fn env_file(self, path: impl AsRef<Path>) -> Result<Self, PaperSummaryError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No env file at {}", path.display());
            return Ok(self);
        }

        let env_err = |detail: String| PaperSummaryError::EnvFile {
            path: path.to_path_buf(),
            detail,
        };

        let iter = dotenv::from_path_iter(path).map_err(|e| env_err(e.to_string()))?;
        let mut pairs = Vec::new();
        for item in iter {
            pairs.push(item.map_err(|e| env_err(e.to_string()))?);
        }

        debug!("Loaded {} entries from {}", pairs.len(), path.display());
        self.env_pairs(pairs)
    }

    /// Apply recognised keys from an iterator of `(key, value)` pairs.
    ///
    /// `ANTHROPIC_API_KEY` and `OPENAI_API_KEY` become provider keys. Unknown
    /// keys are ignored so the same file can hold settings for other tools.
    pub fn env_pairs<I, K, V>(mut self, pairs: I) -> Result<Self, PaperSummaryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            match key {
                "PAPER_SUMMARY_TOKEN_BUDGET" => {
                    self = self.token_budget(parse_number(key, value)?);
                }
                "PAPER_SUMMARY_DOWNLOAD_TIMEOUT" => {
                    self = self.download_timeout_secs(parse_number(key, value)? as u64);
                }
                "PAPER_SUMMARY_MODEL" => self = self.model(value),
                "PAPER_SUMMARY_PROVIDER" => self = self.provider_name(value),
                "PAPER_SUMMARY_TOKENIZER" => self = self.tokenizer_path(value),
                "PAPER_SUMMARY_ARXIV_API" => self = self.arxiv_api_url(value),
                "PDFIUM_LIB_PATH" => self = self.pdfium_library_path(value),
                "ANTHROPIC_API_KEY" => self = self.api_key("anthropic", value),
                "OPENAI_API_KEY" => self = self.api_key("openai", value),
                _ => {}
            }
        }
        Ok(self)
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, PaperSummaryError> {
        let c = &self.config;
        if c.arxiv_api_url.trim().is_empty() {
            return Err(PaperSummaryError::InvalidConfig(
                "arXiv API URL must not be empty".into(),
            ));
        }
        if c.model.as_deref().is_some_and(str::is_empty) {
            return Err(PaperSummaryError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, PaperSummaryError> {
    value.parse().map_err(|_| {
        PaperSummaryError::InvalidConfig(format!(
            "{key} must be a non-negative integer, got '{value}'"
        ))
    })
}
