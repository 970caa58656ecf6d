//! Error types for the paper-summary library.
//!
//! Every failure is fatal for the run that hit it: there is no partial
//! result and nothing is retried. [`PaperSummaryError`] carries enough
//! context for a useful message, and [`PaperSummaryError::kind`] folds the
//! variants into the small taxonomy callers usually branch on (not found,
//! transient I/O, unparseable document, model service failure).
//!
//! Malformed model output is deliberately *not* an error. The section parser
//! reports it as [`crate::pipeline::sections::SectionWarning`] values on the
//! finished [`crate::output::PaperSummary`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper-summary library.
#[derive(Debug, Error)]
pub enum PaperSummaryError {
    // ── Repository errors ─────────────────────────────────────────────────
    /// The repository has no paper with this identifier.
    #[error("Paper '{id}' was not found in the repository")]
    PaperNotFound { id: String },

    /// The repository lookup endpoint could not be reached or answered badly.
    #[error("Paper repository unavailable at '{url}': {reason}")]
    RepositoryUnavailable { url: String, reason: String },

    /// The lookup answered, but the feed could not be understood.
    #[error("Malformed repository feed: {detail}")]
    MalformedFeed { detail: String },

    /// The document payload download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Lookup or download exceeded the configured timeout.
    #[error(
        "Request timed out after {secs}s for '{url}'\nIncrease --download-timeout or PAPER_SUMMARY_DOWNLOAD_TIMEOUT."
    )]
    DownloadTimeout { url: String, secs: u64 },

    /// The scoped temporary directory could not be created or written.
    #[error("Temporary storage failed: {0}")]
    TempStorage(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// The downloaded payload is not a PDF.
    #[error("Payload for '{id}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { id: String, magic: [u8; 4] },

    /// pdfium could not open the document.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Text extraction failed for a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The generation request failed (transport, auth, rate limit, ...).
    #[error("LLM API error from '{provider}': {message}")]
    LlmApiError { provider: String, message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The env file exists but could not be read or parsed.
    #[error("Failed to read env file '{path}': {detail}")]
    EnvFile { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`PaperSummaryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// The identifier did not resolve to a paper.
    NotFound,
    /// Network or temporary-storage failure while fetching the paper.
    TransientIo,
    /// The document (or the feed describing it) could not be parsed.
    Parse,
    /// The generation service failed or is not set up.
    Service,
    /// Bad configuration or missing native library.
    Config,
    Internal,
}

impl PaperSummaryError {
    pub fn kind(&self) -> ErrorKind {
        use PaperSummaryError::*;
        match self {
            PaperNotFound { .. } => ErrorKind::NotFound,
            RepositoryUnavailable { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | TempStorage(_) => ErrorKind::TransientIo,
            MalformedFeed { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | TextExtractionFailed { .. } => ErrorKind::Parse,
            ProviderNotConfigured { .. } | LlmApiError { .. } => ErrorKind::Service,
            InvalidConfig(_) | EnvFile { .. } | PdfiumBindingFailed(_) => ErrorKind::Config,
            OutputWriteFailed { .. } | Internal(_) => ErrorKind::Internal,
        }
    }
}
