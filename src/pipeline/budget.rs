//! Token budgeting: concatenate page text until a size ceiling is crossed.
//!
//! Pages are never split. Each page is appended whole and only then is the
//! running total compared with the budget, so the page that crosses the
//! ceiling is still sent. The overshoot is therefore bounded by one page.

use crate::error::PaperSummaryError;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, warn};

/// Measures the size of a piece of text in model tokens.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Rough estimate used when no provider tokenizer is configured.
///
/// English prose averages about four characters per token for current
/// BPE tokenizers; this rounds up so short non-empty text counts as one.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Counts tokens with a HuggingFace `tokenizer.json` published for the model.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PaperSummaryError> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            PaperSummaryError::InvalidConfig(format!(
                "Failed to load tokenizer '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded tokenizer from {}", path.display());
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                warn!("Tokenizer failed ({}); falling back to estimate", e);
                HeuristicTokenCounter.count(text)
            }
        }
    }
}

/// Text accumulated under the budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulated {
    /// Page texts in document order, each followed by `\n`.
    pub text: String,
    /// Sum of the measured sizes of the included pages.
    pub tokens: usize,
    pub pages_used: usize,
    pub pages_total: usize,
}

impl Accumulated {
    /// True when trailing pages were dropped.
    pub fn is_truncated(&self) -> bool {
        self.pages_used < self.pages_total
    }
}

/// Concatenate `pages` in order until the running token total exceeds `budget`.
pub fn accumulate_pages<S: AsRef<str>>(
    pages: &[S],
    budget: usize,
    counter: &dyn TokenCounter,
) -> Accumulated {
    let mut acc = Accumulated {
        pages_total: pages.len(),
        ..Default::default()
    };

    for (idx, page) in pages.iter().enumerate() {
        let page = page.as_ref();
        let tokens = counter.count(page);
        acc.tokens += tokens;
        acc.text.push_str(page);
        acc.text.push('\n');
        acc.pages_used += 1;
        debug!("Page {}: {} tokens (running total {})", idx + 1, tokens, acc.tokens);

        if acc.tokens > budget {
            break;
        }
    }

    if acc.is_truncated() {
        warn!(
            "Token budget {} reached after {}/{} pages ({} tokens)",
            budget, acc.pages_used, acc.pages_total, acc.tokens
        );
    }

    acc
}
