//! # paper-summary
//!
//! Fetch a paper from arXiv by identifier, extract its text, and have an LLM
//! summarise it into labelled Markdown sections (objective, implementation,
//! insights, results).
//!
//! ## Pipeline Overview
//!
//! ```text
//! identifier
//!  │
//!  ├─ 1. Fetch    arXiv lookup + PDF download into a scoped temp dir
//!  ├─ 2. Extract  per-page text via pdfium (spawn_blocking)
//!  ├─ 3. Budget   concatenate pages until the token ceiling is crossed
//!  ├─ 4. Prompt   fixed four-task instruction template
//!  ├─ 5. LLM      one request, temperature 0, max 1024 output tokens
//!  └─ 6. Render   tagged response → `### Heading` sections under `# Title`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper_summary::{summarize, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from ANTHROPIC_API_KEY / OPENAI_API_KEY / ...
//!     let config = SummaryConfig::builder().env_file(".env")?.build()?;
//!     let summary = summarize("2306.01116", &config).await?;
//!     println!("{}", summary.markdown);
//!     for w in &summary.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Swapping capabilities
//!
//! [`Summarizer::with_capabilities`] accepts any [`PaperRepository`],
//! [`PageExtractor`], [`TokenCounter`] and [`TextGenerator`], which is how the
//! integration tests run the pipeline without network access.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper-summary` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SummaryConfig, SummaryConfigBuilder};
pub use error::{ErrorKind, PaperSummaryError};
pub use output::{PaperRecord, PaperSummary, SummaryStats};
pub use pipeline::budget::{HeuristicTokenCounter, HfTokenCounter, TokenCounter};
pub use pipeline::extract::{PageExtractor, PdfiumExtractor};
pub use pipeline::fetch::{ArxivClient, PaperRepository};
pub use pipeline::llm::{Generation, GenerationOptions, ProviderGenerator, TextGenerator};
pub use pipeline::sections::{SectionKind, SectionWarning};
pub use summarize::{summarize, summarize_sync, summarize_to_file, Summarizer};
