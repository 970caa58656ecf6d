//! Paper fetching: resolve an identifier and download its PDF to scoped storage.
//!
//! ## Why a temp directory?
//!
//! pdfium opens documents from a file-system path. The payload is written into
//! a `TempDir` owned by the returned [`FetchedPaper`], so the file disappears
//! when that value is dropped: after extraction, on an early `?` return, or
//! during unwinding. Magic bytes (`%PDF`) are checked before returning so a
//! repository error page surfaces as [`PaperSummaryError::NotAPdf`] rather
//! than as an opaque pdfium failure.

use crate::config::SummaryConfig;
use crate::error::PaperSummaryError;
use crate::output::PaperRecord;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("paper-summary/", env!("CARGO_PKG_VERSION"));

/// A source of papers addressable by identifier.
#[async_trait]
pub trait PaperRepository: Send + Sync {
    /// Look up exactly one paper. No match is [`PaperSummaryError::PaperNotFound`].
    async fn lookup(&self, id: &str) -> Result<PaperRecord, PaperSummaryError>;

    /// Fetch the document payload for `record`.
    async fn download(&self, record: &PaperRecord) -> Result<Vec<u8>, PaperSummaryError>;
}

/// A downloaded paper whose PDF lives until this value is dropped.
#[derive(Debug)]
pub struct FetchedPaper {
    pub record: PaperRecord,
    path: PathBuf,
    _temp_dir: TempDir,
}

impl FetchedPaper {
    /// Path to the temporary PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the download, deleting the temporary file.
    pub fn into_record(self) -> PaperRecord {
        self.record
    }
}

/// Look up `id`, download its payload and store it in a fresh temp directory.
pub async fn fetch_paper(
    repository: &dyn PaperRepository,
    id: &str,
) -> Result<FetchedPaper, PaperSummaryError> {
    let record = repository.lookup(id).await?;
    info!("Found paper {}: {}", record.id, record.title);

    let bytes = repository.download(&record).await?;
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(PaperSummaryError::NotAPdf {
            id: id.to_string(),
            magic,
        });
    }

    let temp_dir = TempDir::new().map_err(|e| PaperSummaryError::TempStorage(e.to_string()))?;
    let path = temp_dir.path().join(format!("{}.pdf", file_stem(id)));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| PaperSummaryError::TempStorage(format!("Failed to write temp file: {}", e)))?;

    debug!("Stored {} bytes at {}", bytes.len(), path.display());

    Ok(FetchedPaper {
        record,
        path,
        _temp_dir: temp_dir,
    })
}

/// Make an identifier safe to use as a file name (`hep-th/9901001` has a slash).
fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "paper".to_string()
    } else {
        stem
    }
}

// ── arXiv ────────────────────────────────────────────────────────────────

/// Client for the arXiv Atom query API.
pub struct ArxivClient {
    client: reqwest::Client,
    api_url: String,
    timeout_secs: u64,
}

impl ArxivClient {
    pub fn new(config: &SummaryConfig) -> Result<Self, PaperSummaryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PaperSummaryError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.arxiv_api_url.clone(),
            timeout_secs: config.download_timeout_secs,
        })
    }

    fn request_error(&self, url: &str, e: reqwest::Error, download: bool) -> PaperSummaryError {
        if e.is_timeout() {
            PaperSummaryError::DownloadTimeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else if download {
            PaperSummaryError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            PaperSummaryError::RepositoryUnavailable {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PaperRepository for ArxivClient {
    async fn lookup(&self, id: &str) -> Result<PaperRecord, PaperSummaryError> {
        debug!("arXiv lookup: {} id_list={}", self.api_url, id);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("id_list", id)])
            .send()
            .await
            .map_err(|e| self.request_error(&self.api_url, e, false))?;

        if !response.status().is_success() {
            return Err(PaperSummaryError::RepositoryUnavailable {
                url: self.api_url.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(&self.api_url, e, false))?;

        parse_atom_feed(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| PaperSummaryError::PaperNotFound { id: id.to_string() })
    }

    async fn download(&self, record: &PaperRecord) -> Result<Vec<u8>, PaperSummaryError> {
        info!("Downloading PDF from: {}", record.pdf_url);

        let response = self
            .client
            .get(&record.pdf_url)
            .send()
            .await
            .map_err(|e| self.request_error(&record.pdf_url, e, true))?;

        if !response.status().is_success() {
            return Err(PaperSummaryError::DownloadFailed {
                url: record.pdf_url.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(&record.pdf_url, e, true))?;
        Ok(bytes.to_vec())
    }
}

// ── Atom parsing ─────────────────────────────────────────────────────────

static RE_FEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"<feed[\s>]").unwrap());
static RE_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<entry[^>]*>(.*?)</entry>").unwrap());
static RE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<id>(.*?)</id>").unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap());
static RE_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").unwrap());
static RE_PUBLISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<published>(.*?)</published>").unwrap());
static RE_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<link\s([^>]*?)/?>").unwrap());
static RE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([\w:-]+)="([^"]*)""#).unwrap());

/// Parse every real paper entry out of an arXiv Atom feed.
///
/// arXiv answers bad identifiers with an `<entry>` whose id points into
/// `/api/errors`, and unknown-but-valid identifiers with an entry that has no
/// title; both are skipped, which leaves the caller with an empty list.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<PaperRecord>, PaperSummaryError> {
    if !RE_FEED.is_match(xml) {
        return Err(PaperSummaryError::MalformedFeed {
            detail: "response has no <feed> element".into(),
        });
    }

    Ok(RE_ENTRY
        .captures_iter(xml)
        .filter_map(|caps| parse_entry(&caps[1]))
        .collect())
}

fn parse_entry(entry: &str) -> Option<PaperRecord> {
    let id_url = capture(&RE_ID, entry)?;
    if id_url.contains("/api/errors") {
        debug!("Skipping arXiv error entry: {}", id_url);
        return None;
    }

    let title = normalize_whitespace(&unescape(&capture(&RE_TITLE, entry)?));
    if title.is_empty() {
        return None;
    }

    let mut pdf_url = None;
    for link in RE_LINK.captures_iter(entry) {
        let attrs: Vec<(String, String)> = RE_ATTR
            .captures_iter(&link[1])
            .map(|a| (a[1].to_string(), unescape(&a[2])))
            .collect();
        let get = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
        if get("title") == Some("pdf") || get("type") == Some("application/pdf") {
            pdf_url = get("href").map(str::to_string);
        }
    }

    let id = id_from_url(&id_url);
    let pdf_url = pdf_url.unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", id));

    Some(PaperRecord {
        id,
        title,
        authors: RE_AUTHOR
            .captures_iter(entry)
            .map(|c| normalize_whitespace(&unescape(&c[1])))
            .collect(),
        summary: capture(&RE_SUMMARY, entry)
            .map(|s| normalize_whitespace(&unescape(&s)))
            .unwrap_or_default(),
        published: capture(&RE_PUBLISHED, entry),
        pdf_url,
    })
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].trim().to_string())
}

/// `http://arxiv.org/abs/1706.03762v7` → `1706.03762v7`.
fn id_from_url(url: &str) -> String {
    match url.rfind("/abs/") {
        Some(pos) => url[pos + 5..].to_string(),
        None => url.to_string(),
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
