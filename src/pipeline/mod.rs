//! Pipeline stages for paper summarisation.
//!
//! Each submodule implements exactly one step. Four capabilities sit behind
//! traits so they can be swapped: [`fetch::PaperRepository`],
//! [`extract::PageExtractor`], [`budget::TokenCounter`] and
//! [`llm::TextGenerator`].
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──▶ budget ──▶ prompt ──▶ llm ──▶ sections
//! (arXiv)   (pdfium)    (tokens)   (template)  (LLM)   (Markdown)
//! ```
//!
//! 1. [`fetch`]    - look the identifier up and download the PDF into a
//!    temp dir that is removed when the fetched value drops
//! 2. [`extract`]  - one text segment per page; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`budget`]   - concatenate pages until the token ceiling is crossed
//! 4. [`crate::prompts`] - embed the text in the fixed instruction template
//! 5. [`llm`]      - one request, one response; the only stage that talks
//!    to the model
//! 6. [`sections`] - scan the tagged response and render headings

pub mod budget;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod sections;
