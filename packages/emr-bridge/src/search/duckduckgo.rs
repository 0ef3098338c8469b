use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::traits::searcher::DocSearcher;
use crate::types::DocHit;

pub const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Keyless fallback search over DuckDuckGo's HTML endpoint.
pub struct DuckDuckGoSearcher {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl Default for DuckDuckGoSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoSearcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DUCKDUCKGO_HTML_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Parse result links and snippets out of a DuckDuckGo HTML results page.
///
/// Each `.result` block yields at most one hit; its snippet is taken from the
/// same block or left empty.
pub fn parse_results(html: &str, limit: usize) -> Vec<DocHit> {
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&result_sel)
        .filter_map(|block| {
            let link = block.select(&link_sel).next()?;
            let url = decode_result_url(link.value().attr("href")?)?;
            let snippet = block
                .select(&snippet_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();
            Some(
                DocHit::new(url)
                    .with_title(element_text(&link))
                    .with_content(snippet),
            )
        })
        .take(limit)
        .collect()
}

/// Result links go through a `/l/?uddg=<encoded target>` redirect.
fn decode_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    let parsed = url::Url::parse(&absolute).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

/// Text content with whitespace runs collapsed.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl DocSearcher for DuckDuckGoSearcher {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocHit>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", "Mozilla/5.0 (compatible; emr-bridge/0.1)")
            .timeout(self.timeout)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| BridgeError::Search(format!("DuckDuckGo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BridgeError::Search(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| BridgeError::Search(format!("DuckDuckGo body unreadable: {e}")))?;

        let hits = parse_results(&html, limit);
        debug!(query = %query, count = hits.len(), "DuckDuckGo search");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdocs.acme%2Demr.example%2Fapi&amp;rut=abc">Acme <b>EMR</b> API</a>
  </h2>
  <a class="result__snippet" href="x">REST endpoints for <b>patients</b> &amp; visits</a>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://fhir.example/push">FHIR push</a>
  </h2>
  <a class="result__snippet" href="y">Bundle upload</a>
</div>
"#;

    #[test]
    fn test_parse_results_decodes_redirects() {
        let hits = parse_results(PAGE, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://docs.acme-emr.example/api");
        assert_eq!(hits[0].title, "Acme EMR API");
        assert_eq!(hits[0].content, "REST endpoints for patients & visits");
        assert_eq!(hits[1].url, "https://fhir.example/push");
        assert_eq!(hits[1].content, "Bundle upload");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
        assert!(parse_results("<html></html>", 3).is_empty());
    }

    #[test]
    fn test_snippets_stay_with_their_result() {
        let page = r#"
<div class="result">
  <a class="result__a" href="https://a.example/x">Acme&#x2F;EMR &#8211; API &nbsp;docs</a>
</div>
<div class="result">
  <a class="result__a" href="https://b.example/y">Second</a>
  <div class="result__snippet">Snippet for the second result</div>
</div>
"#;
        let hits = parse_results(page, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.example/x");
        assert_eq!(hits[0].title, "Acme/EMR \u{2013} API docs");
        assert_eq!(hits[0].content, "");
        assert_eq!(hits[1].url, "https://b.example/y");
        assert_eq!(hits[1].content, "Snippet for the second result");
    }

    #[test]
    fn test_result_without_link_is_skipped() {
        let page = r#"<div class="result"><div class="result__snippet">orphan</div></div>"#;
        assert!(parse_results(page, 10).is_empty());
    }

    #[test]
    fn test_decode_result_url_rejects_other_schemes() {
        assert_eq!(decode_result_url("javascript:void(0)"), None);
    }
}
