//! Result types returned by the summarisation entry points.

use crate::pipeline::sections::{SectionKind, SectionWarning};
use serde::{Deserialize, Serialize};

/// Repository metadata for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Identifier as the repository reports it (may carry a version suffix).
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    /// The paper's abstract.
    pub summary: String,
    /// Publication timestamp as given by the repository.
    pub published: Option<String>,
    /// Where the document payload is downloaded from.
    pub pdf_url: String,
}

/// Counters and timings for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Pages the extractor produced.
    pub pages_total: usize,
    /// Pages that made it into the prompt.
    pub pages_used: usize,
    /// Measured size of the accumulated paper text.
    pub paper_tokens: usize,
    /// True when the budget cut off trailing pages.
    pub truncated: bool,
    /// Prompt tokens as reported by the provider.
    pub input_tokens: usize,
    /// Completion tokens as reported by the provider.
    pub output_tokens: usize,
    pub fetch_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The finished summary of one paper.
#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    /// Identifier the caller asked for.
    pub paper_id: String,
    pub record: PaperRecord,
    /// Rendered Markdown: title heading followed by the sectioned response.
    pub markdown: String,
    /// Section bodies in the order the model produced them.
    pub sections: Vec<(SectionKind, String)>,
    /// Structural problems found in the model output. Empty when well formed.
    pub warnings: Vec<SectionWarning>,
    pub stats: SummaryStats,
}

impl PaperSummary {
    /// Body of the first section of `kind`, if the model produced one.
    pub fn section(&self, kind: SectionKind) -> Option<&str> {
        self.sections
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, body)| body.as_str())
    }
}
