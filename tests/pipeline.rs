//! Pipeline integration tests with in-memory capabilities.
//!
//! No network, no pdfium: the repository, extractor, counter and generator
//! are all fakes, so these run everywhere.

use async_trait::async_trait;
use paper_summary::{
    ErrorKind, Generation, GenerationOptions, PageExtractor, PaperRecord, PaperRepository,
    PaperSummaryError, ProviderGenerator, SectionKind, SectionWarning, Summarizer, SummaryConfig,
    TextGenerator, TokenCounter,
};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse, LlmError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

const PDF_BYTES: &[u8] = b"%PDF-1.5\n% fake body\n%%EOF\n";

struct FakeRepository {
    records: Vec<PaperRecord>,
    payload: Result<Vec<u8>, ()>,
    downloads: AtomicUsize,
}

impl FakeRepository {
    fn with_paper(id: &str, title: &str) -> Self {
        Self {
            records: vec![record(id, title)],
            payload: Ok(PDF_BYTES.to_vec()),
            downloads: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self {
            records: vec![],
            payload: Ok(PDF_BYTES.to_vec()),
            downloads: AtomicUsize::new(0),
        }
    }
}

fn record(id: &str, title: &str) -> PaperRecord {
    PaperRecord {
        id: id.to_string(),
        title: title.to_string(),
        authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
        summary: "An abstract.".into(),
        published: Some("2023-09-11T17:47:22Z".into()),
        pdf_url: format!("https://arxiv.org/pdf/{id}"),
    }
}

#[async_trait]
impl PaperRepository for FakeRepository {
    async fn lookup(&self, id: &str) -> Result<PaperRecord, PaperSummaryError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PaperSummaryError::PaperNotFound { id: id.to_string() })
    }

    async fn download(&self, record: &PaperRecord) -> Result<Vec<u8>, PaperSummaryError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.payload
            .clone()
            .map_err(|_| PaperSummaryError::DownloadFailed {
                url: record.pdf_url.clone(),
                reason: "connection reset".into(),
            })
    }
}

struct FakeExtractor {
    pages: Result<Vec<String>, ()>,
    seen_path: Mutex<Option<PathBuf>>,
}

impl FakeExtractor {
    fn pages(pages: &[&str]) -> Self {
        Self {
            pages: Ok(pages.iter().map(|p| p.to_string()).collect()),
            seen_path: Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            pages: Err(()),
            seen_path: Mutex::new(None),
        }
    }

    fn seen_path(&self) -> Option<PathBuf> {
        self.seen_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageExtractor for FakeExtractor {
    async fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PaperSummaryError> {
        assert!(path.exists(), "payload must exist while extracting");
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(bytes, PDF_BYTES);
        *self.seen_path.lock().unwrap() = Some(path.to_path_buf());

        self.pages
            .clone()
            .map_err(|_| PaperSummaryError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "bad xref".into(),
            })
    }
}

struct FakeGenerator {
    response: Result<String, String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_options: Mutex<Option<GenerationOptions>>,
}

impl FakeGenerator {
    fn replying(content: &str) -> Self {
        Self {
            response: Ok(content.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_options: Mutex::new(None),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.last_prompt.lock().unwrap().clone().expect("generator was called")
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, PaperSummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        *self.last_options.lock().unwrap() = Some(*options);
        match &self.response {
            Ok(content) => Ok(Generation {
                content: content.clone(),
                prompt_tokens: 1200,
                completion_tokens: 80,
            }),
            Err(message) => Err(PaperSummaryError::LlmApiError {
                provider: "fake".into(),
                message: message.clone(),
            }),
        }
    }
}

struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

fn summarizer(
    config: &SummaryConfig,
    repository: &Arc<FakeRepository>,
    extractor: &Arc<FakeExtractor>,
    generator: &Arc<FakeGenerator>,
) -> Summarizer {
    Summarizer::with_capabilities(
        config,
        repository.clone(),
        extractor.clone(),
        Arc::new(WordCounter),
        generator.clone(),
    )
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn renders_title_and_sections_exactly() {
    let repository = Arc::new(FakeRepository::with_paper("2309.05463", "Paper X"));
    let extractor = Arc::new(FakeExtractor::pages(&["intro text", "method text"]));
    let generator = Arc::new(FakeGenerator::replying(
        "<objective>A does B.</objective><results>C improved.</results>",
    ));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let summary = s.summarize("2309.05463").await.expect("summary");

    assert_eq!(
        summary.markdown,
        "# Paper X\n\n### Objective\nA does B.### Results\nC improved."
    );
    assert_eq!(summary.section(SectionKind::Objective), Some("A does B."));
    assert_eq!(summary.section(SectionKind::Results), Some("C improved."));
    assert_eq!(summary.section(SectionKind::Insights), None);
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.stats.pages_total, 2);
    assert_eq!(summary.stats.pages_used, 2);
    assert_eq!(summary.stats.input_tokens, 1200);
    assert_eq!(summary.stats.output_tokens, 80);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn prompt_contains_pages_in_order_with_fixed_options() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["first page", "", "third page"]));
    let generator = Arc::new(FakeGenerator::replying("<results>ok</results>"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    s.summarize("1").await.unwrap();

    let prompt = generator.last_prompt();
    assert!(prompt.starts_with("please complete the following tasks for the <paper>:"));
    assert!(prompt.contains("<paper>first page\n\nthird page\n</paper>"));
    assert_eq!(
        *generator.last_options.lock().unwrap(),
        Some(GenerationOptions {
            temperature: 0.0,
            max_tokens: 1024
        })
    );
}

#[tokio::test]
async fn budget_cuts_after_crossing_page() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["a b", "c d e", "f", "g"]));
    let generator = Arc::new(FakeGenerator::replying("x"));
    let config = SummaryConfig::builder().token_budget(4).build().unwrap();
    let s = summarizer(&config, &repository, &extractor, &generator);

    let summary = s.summarize("1").await.unwrap();

    assert!(generator.last_prompt().contains("<paper>a b\nc d e\n</paper>"));
    assert_eq!(summary.stats.pages_used, 2);
    assert_eq!(summary.stats.paper_tokens, 5);
    assert!(summary.stats.truncated);
}

#[tokio::test]
async fn empty_document_still_prompts() {
    let repository = Arc::new(FakeRepository::with_paper("1", "Blank"));
    let extractor = Arc::new(FakeExtractor::pages(&[]));
    let generator = Arc::new(FakeGenerator::replying("nothing to say"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let summary = s.summarize("1").await.unwrap();

    assert!(generator.last_prompt().ends_with("<paper></paper>\n"));
    assert_eq!(summary.markdown, "# Blank\n\nnothing to say");
    assert!(!summary.stats.truncated);
}

#[tokio::test]
async fn malformed_output_is_rendered_and_reported() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying(
        "<summary>Overview<objective>Goal</objective>",
    ));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let summary = s.summarize("1").await.unwrap();

    assert_eq!(summary.markdown, "# T\n\n### Summary\nOverview### Objective\nGoal");
    assert_eq!(
        summary.warnings,
        vec![SectionWarning::Interrupted {
            kind: SectionKind::Summary,
            by: SectionKind::Objective
        }]
    );
}

#[tokio::test]
async fn metadata_front_matter_when_enabled() {
    let repository = Arc::new(FakeRepository::with_paper("2306.01116", "RefinedWeb"));
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying("<results>r</results>"));
    let config = SummaryConfig::builder().include_metadata(true).build().unwrap();
    let s = summarizer(&config, &repository, &extractor, &generator);

    let summary = s.summarize("2306.01116").await.unwrap();

    assert!(summary.markdown.starts_with("---\nid: \"2306.01116\"\n"));
    assert!(summary.markdown.contains("  - \"Alan Turing\"\n"));
    assert!(summary.markdown.ends_with("# RefinedWeb\n\n### Results\nr"));
}

// ── Temp file lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn temp_payload_removed_after_success() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying("x"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    s.summarize("1").await.unwrap();

    let path = extractor.seen_path().expect("extractor saw a path");
    assert!(!path.exists(), "temp payload should be gone: {}", path.display());
}

#[tokio::test]
async fn temp_payload_removed_after_extraction_failure() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::failing());
    let generator = Arc::new(FakeGenerator::replying("x"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let err = s.summarize("1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    let path = extractor.seen_path().expect("extractor saw a path");
    assert!(!path.exists());
    assert_eq!(generator.calls(), 0);
}

// ── Error propagation ────────────────────────────────────────────────────────

#[tokio::test]
async fn not_found_skips_download_and_generation() {
    let repository = Arc::new(FakeRepository::empty());
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying("x"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let err = s.summarize("0000.00000").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(err, PaperSummaryError::PaperNotFound { ref id } if id == "0000.00000"));
    assert_eq!(repository.downloads.load(Ordering::SeqCst), 0);
    assert!(extractor.seen_path().is_none());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn download_failure_is_transient_io() {
    let repository = Arc::new(FakeRepository {
        payload: Err(()),
        ..FakeRepository::with_paper("1", "T")
    });
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying("x"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let err = s.summarize("1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientIo);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn non_pdf_payload_is_parse_error() {
    let repository = Arc::new(FakeRepository {
        payload: Ok(b"<html>rate limited</html>".to_vec()),
        ..FakeRepository::with_paper("1", "T")
    });
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying("x"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let err = s.summarize("1").await.unwrap_err();

    assert!(matches!(err, PaperSummaryError::NotAPdf { magic, .. } if &magic == b"<htm"));
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(extractor.seen_path().is_none());
}

#[tokio::test]
async fn service_error_propagates() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::failing("429 Too Many Requests"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let err = s.summarize("1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert!(err.to_string().contains("429 Too Many Requests"));
    assert_eq!(generator.calls(), 1);
}

/// Provider that always fails the way a dropped connection does.
struct OfflineProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl LLMProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    fn model(&self) -> &str {
        "offline-model"
    }

    fn max_context_length(&self) -> usize {
        200_000
    }

    async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::NetworkError("connection reset by peer".into()))
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete(prompt).await
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete("").await
    }
}

#[tokio::test]
async fn provider_transport_error_is_a_service_error() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let provider = Arc::new(OfflineProvider {
        calls: AtomicUsize::new(0),
    });
    let s = Summarizer::with_capabilities(
        &SummaryConfig::default(),
        repository,
        extractor,
        Arc::new(WordCounter),
        Arc::new(ProviderGenerator::new(provider.clone(), "anthropic")),
    );

    let err = s.summarize("1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert!(matches!(err, PaperSummaryError::LlmApiError { provider: ref label, .. } if label == "anthropic"));
    assert!(err.to_string().contains("connection reset by peer"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn runs_are_independent() {
    let repository = Arc::new(FakeRepository::with_paper("1", "T"));
    let extractor = Arc::new(FakeExtractor::pages(&["p"]));
    let generator = Arc::new(FakeGenerator::replying("<insights>- a</insights>"));
    let s = summarizer(&SummaryConfig::default(), &repository, &extractor, &generator);

    let a = s.summarize("1").await.unwrap();
    let b = s.summarize("1").await.unwrap();

    assert_eq!(a.markdown, b.markdown);
    assert_eq!(generator.calls(), 2);
    assert_eq!(repository.downloads.load(Ordering::SeqCst), 2);
}
