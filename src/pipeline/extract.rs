//! Text extraction: read each PDF page's text via pdfium, in page order.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a thread designed for
//! blocking operations so Tokio worker threads keep running.

use crate::error::PaperSummaryError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns a document on disk into one text segment per page.
///
/// Blank pages yield empty strings; order matches the document.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PaperSummaryError>;
}

/// [`PageExtractor`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_dir: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Bind to pdfium in `library_dir`, or to the system library when `None`.
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

#[async_trait]
impl PageExtractor for PdfiumExtractor {
    async fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PaperSummaryError> {
        let path = path.to_path_buf();
        let library_dir = self.library_dir.clone();

        tokio::task::spawn_blocking(move || extract_pages_blocking(&path, library_dir.as_deref()))
            .await
            .map_err(|e| PaperSummaryError::Internal(format!("Extraction task panicked: {}", e)))?
    }
}

fn bind_pdfium(library_dir: Option<&Path>) -> Result<Pdfium, PaperSummaryError> {
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PaperSummaryError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page text extraction.
fn extract_pages_blocking(
    pdf_path: &Path,
    library_dir: Option<&Path>,
) -> Result<Vec<String>, PaperSummaryError> {
    let pdfium = bind_pdfium(library_dir)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| PaperSummaryError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| PaperSummaryError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.len());
        texts.push(text);
    }

    Ok(texts)
}
