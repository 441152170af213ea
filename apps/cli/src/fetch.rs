//! Page fetcher — the `Fetcher` capability plus the reqwest-backed HTTP
//! implementation and HTML-to-text reduction.
//!
//! Fetch is treated as a likely-permanent condition and is never retried
//! automatically: an unreachable posting URL needs a corrected URL, not a
//! second attempt. The target may also be a local `.txt`/`.md` file holding
//! the job description, for postings behind scrape-blockers.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Fetched job content is truncated to this many characters before the
/// extraction prompt, to stay within context limits.
const MAX_CONTENT_CHARS: usize = 8000;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL returned non-success status {0}")]
    Status(u16),

    #[error("not a well-formed HTTP/HTTPS URL: {0}")]
    BadUrl(String),

    #[error("failed to read job description file {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
}

/// The fetch capability: a URL (or local file path) in, reduced page text out.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &str) -> Result<String, FetchError>;
}

/// Production fetcher. Fetches over HTTP with a browser user agent, or reads
/// a local file when the target is an existing path.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        // Local file path: job description saved by hand from a site that
        // blocks scraping. Exempt from the URL well-formedness check.
        let path = Path::new(target);
        if path.is_file() {
            debug!("Reading job description from file: {}", target);
            let text = std::fs::read_to_string(path).map_err(|e| FetchError::File {
                path: target.to_string(),
                source: e,
            })?;
            return Ok(truncate_chars(text.trim(), MAX_CONTENT_CHARS));
        }

        if !target.starts_with("http://") && !target.starts_with("https://") {
            return Err(FetchError::BadUrl(target.to_string()));
        }

        let response = self.client.get(target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), target);
        Ok(html_to_text(&html))
    }
}

/// Reduces an HTML page to cleaned plain text: noise elements removed, tags
/// stripped, entities decoded, blank lines dropped, truncated to the content
/// budget.
pub fn html_to_text(html: &str) -> String {
    let noise = Regex::new(
        r"(?is)<(script|style|nav|header|footer|aside)\b[^>]*>.*?</(script|style|nav|header|footer|aside)>",
    )
    .expect("valid regex");
    let block_break = Regex::new(r"(?i)<(/p|/li|/div|/h[1-6]|/tr|br\s*/?)>").expect("valid regex");
    let any_tag = Regex::new(r"(?s)<[^>]+>").expect("valid regex");

    let text = noise.replace_all(html, " ");
    let text = block_break.replace_all(&text, "\n");
    let text = any_tag.replace_all(&text, " ");
    let text = decode_entities(&text);

    let cleaned = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(&cleaned, MAX_CONTENT_CHARS)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
