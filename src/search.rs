//! Search provider integration
//!
//! Web search is the only way evidence enters the system. The provider
//! is behind a narrow trait so the collector can be exercised with a
//! stub; the production implementation calls the Tavily API through a
//! long-lived reqwest::Client for connection pooling.

use crate::error::ResearchError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error};

/// One raw search hit, before normalization into an EvidenceItem.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// Narrow contract for the external search provider.
///
/// A transport or timeout failure is surfaced as an error; the caller
/// treats it as zero results for that subtopic.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

/// Tavily-backed search client (connection-pooled)
pub struct TavilyClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://api.tavily.com/search".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TAVILY_API_KEY")
            .map_err(|_| ResearchError::ConfigError("TAVILY_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        if self.api_key.is_empty() {
            return Err(ResearchError::ConfigError(
                "TAVILY_API_KEY not configured".to_string(),
            ));
        }

        let request = TavilyRequest {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            search_depth: "advanced".to_string(),
            include_answer: false,
            include_raw_content: false,
            max_results,
        };

        debug!(query = %query, max_results, "Calling Tavily API");

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Tavily request failed: {}", e);
                ResearchError::SearchError(format!("Tavily request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Tavily error response ({}): {}", status, body);
            return Err(ResearchError::SearchError(format!(
                "Tavily returned {}: {}",
                status, body
            )));
        }

        let tavily: TavilyResponse = response.json().await.map_err(|e| {
            ResearchError::SearchError(format!("Tavily parse error: {}", e))
        })?;

        Ok(tavily
            .results
            .into_iter()
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                content: r.content,
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest {
    api_key: String,
    query: String,
    search_depth: String,
    include_answer: bool,
    include_raw_content: bool,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

//
// ================= Test / development providers =================
//

/// Stub provider returning a fixed number of canned results per query.
/// Keeps the collector and workflow testable without network access.
pub struct StubSearchProvider {
    pub results_per_query: usize,
}

impl StubSearchProvider {
    pub fn new(results_per_query: usize) -> Self {
        Self { results_per_query }
    }
}

#[async_trait]
impl SearchProvider for StubSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let count = self.results_per_query.min(max_results);
        Ok((0..count)
            .map(|i| SearchResult {
                url: format!("https://www.reuters.com/markets/stub/{}", i),
                title: format!("Result {} for {}", i + 1, query),
                content: format!("Stub evidence body {} for query: {}", i + 1, query),
            })
            .collect())
    }
}

/// Provider that always fails, for exercising the non-fatal error path.
pub struct FailingSearchProvider;

#[async_trait]
impl SearchProvider for FailingSearchProvider {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        Err(ResearchError::SearchError(
            "simulated provider outage".to_string(),
        ))
    }
}
