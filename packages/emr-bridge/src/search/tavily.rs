use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::security::SecretString;
use crate::traits::searcher::DocSearcher;
use crate::types::DocHit;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily-backed search. Unconfigured (and skipped) without an API key.
pub struct TavilySearcher {
    api_key: Option<SecretString>,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl TavilySearcher {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_blank()),
            client: reqwest::Client::new(),
            endpoint: TAVILY_SEARCH_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Point at a different endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl DocSearcher for TavilySearcher {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocHit>> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };

        let request = SearchRequest {
            query,
            search_depth: "basic",
            max_results: limit,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::Search(format!("Tavily request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BridgeError::Search(format!(
                "Tavily API error: {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Search(format!("Tavily response unreadable: {e}")))?;

        let hits: Vec<DocHit> = body
            .results
            .into_iter()
            .filter_map(|r| {
                let url = r.url.filter(|u| !u.is_empty())?;
                Some(
                    DocHit::new(url)
                        .with_title(r.title.unwrap_or_default())
                        .with_content(r.content.unwrap_or_default()),
                )
            })
            .take(limit)
            .collect();

        debug!(query = %query, count = hits.len(), "Tavily search");
        Ok(hits)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
