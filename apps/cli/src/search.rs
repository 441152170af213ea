//! Search client — the `SearchService` capability plus the Tavily-backed
//! implementation used in production.
//!
//! The provider is only reached through the trait so tests can substitute a
//! deterministic mock. Retry policy mirrors the LLM client: transient
//! statuses (429/5xx) and transport errors get bounded retries with
//! exponential backoff; auth and quota problems fail fast.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 6;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("search auth rejected (status {0}) — check TAVILY_API_KEY")]
    Auth(u16),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// One search result, ordered as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub source_url: String,
}

/// The search capability. A query in, an ordered sequence of hits out.
/// Zero hits is a valid (degraded) outcome, not an error.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily-backed search client.
#[derive(Clone)]
pub struct TavilySearch {
    client: Client,
    api_key: String,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl SearchService for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let request_body = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: MAX_RESULTS,
            search_depth: "advanced",
        };

        let mut last_error: Option<SearchError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Search attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(TAVILY_API_URL).json(&request_body).send().await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(SearchError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(SearchError::Auth(status.as_u16()));
            }

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Search API returned {}: {}", status, body);
                last_error = Some(SearchError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let parsed: TavilyResponse = response.json().await?;
            debug!("Search '{}' returned {} hits", query, parsed.results.len());

            return Ok(parsed
                .results
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    snippet: r.content,
                    source_url: r.url,
                })
                .collect());
        }

        Err(last_error.unwrap_or(SearchError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}
