use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::text::truncate_chars;
use crate::traits::searcher::DocSearcher;
use crate::types::DocSearchResult;

/// Queries considered per discovery run.
pub const MAX_QUERIES: usize = 5;
pub const MAX_SNIPPET_CHARS: usize = 2000;

const PRIMARY_RESULTS_PER_QUERY: usize = 5;
const FALLBACK_RESULTS_PER_QUERY: usize = 3;

/// Primary search backend with a fallback used when the primary finds nothing.
///
/// Both backends are best-effort: a failed query is logged and contributes
/// no results. URLs are de-duplicated, first occurrence wins.
pub struct DocDiscovery {
    primary: Arc<dyn DocSearcher>,
    fallback: Arc<dyn DocSearcher>,
    primary_limit: usize,
    fallback_limit: usize,
}

impl DocDiscovery {
    pub fn new(primary: Arc<dyn DocSearcher>, fallback: Arc<dyn DocSearcher>) -> Self {
        Self {
            primary,
            fallback,
            primary_limit: PRIMARY_RESULTS_PER_QUERY,
            fallback_limit: FALLBACK_RESULTS_PER_QUERY,
        }
    }

    pub fn with_limits(mut self, primary: usize, fallback: usize) -> Self {
        self.primary_limit = primary;
        self.fallback_limit = fallback;
        self
    }

    pub async fn discover(&self, queries: &[String]) -> DocSearchResult {
        let queries = &queries[..queries.len().min(MAX_QUERIES)];
        let mut seen = HashSet::new();

        let mut result = self
            .search_backend(self.primary.as_ref(), queries, self.primary_limit, &mut seen)
            .await;
        if result.is_empty() {
            result = self
                .search_backend(self.fallback.as_ref(), queries, self.fallback_limit, &mut seen)
                .await;
        }
        result
    }

    async fn search_backend(
        &self,
        backend: &dyn DocSearcher,
        queries: &[String],
        limit: usize,
        seen: &mut HashSet<String>,
    ) -> DocSearchResult {
        let mut result = DocSearchResult::default();
        if queries.is_empty() || !backend.is_configured() {
            info!(backend = backend.name(), "Search backend skipped");
            return result;
        }

        for query in queries {
            match backend.search(query, limit).await {
                Ok(hits) => {
                    for mut hit in hits {
                        if hit.url.is_empty() || !seen.insert(hit.url.clone()) {
                            continue;
                        }
                        hit.content = truncate_chars(&hit.content, MAX_SNIPPET_CHARS).to_string();
                        result.results.push(hit);
                    }
                }
                Err(e) => {
                    warn!(
                        backend = backend.name(),
                        query = %truncate_chars(query, 50),
                        error = %e,
                        "Search query failed"
                    );
                }
            }
        }

        info!(
            backend = backend.name(),
            queries = queries.len(),
            urls = result.results.len(),
            "Search complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearcher;
    use crate::types::DocHit;

    fn queries(qs: &[&str]) -> Vec<String> {
        qs.iter().map(|q| q.to_string()).collect()
    }

    #[tokio::test]
    async fn test_dedupes_across_queries() {
        let primary = MockSearcher::new("primary")
            .with_hits("a", vec![DocHit::new("https://x/1"), DocHit::new("https://x/2")])
            .with_hits("b", vec![DocHit::new("https://x/2"), DocHit::new("https://x/3")]);
        let discovery = DocDiscovery::new(Arc::new(primary), Arc::new(MockSearcher::new("fallback")));

        let result = discovery.discover(&queries(&["a", "b"])).await;

        assert_eq!(result.urls(), vec!["https://x/1", "https://x/2", "https://x/3"]);
    }

    #[tokio::test]
    async fn test_fallback_only_when_primary_empty() {
        let primary = MockSearcher::new("primary").with_hits("a", vec![DocHit::new("https://p/1")]);
        let fallback = Arc::new(MockSearcher::new("fallback").with_hits("a", vec![DocHit::new("https://f/1")]));
        let discovery = DocDiscovery::new(Arc::new(primary), fallback.clone());

        let result = discovery.discover(&queries(&["a"])).await;

        assert_eq!(result.urls(), vec!["https://p/1"]);
        assert!(fallback.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_primary_falls_through() {
        let primary = Arc::new(MockSearcher::new("primary").unconfigured());
        let fallback = MockSearcher::new("fallback").with_hits("a", vec![DocHit::new("https://f/1")]);
        let discovery = DocDiscovery::new(primary.clone(), Arc::new(fallback));

        let result = discovery.discover(&queries(&["a"])).await;

        assert_eq!(result.urls(), vec!["https://f/1"]);
        assert!(primary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_query_does_not_abort_others() {
        let primary = MockSearcher::new("primary")
            .fail_query("a")
            .with_hits("b", vec![DocHit::new("https://x/b")]);
        let discovery = DocDiscovery::new(Arc::new(primary), Arc::new(MockSearcher::new("fallback")));

        let result = discovery.discover(&queries(&["a", "b"])).await;

        assert_eq!(result.urls(), vec!["https://x/b"]);
    }

    #[tokio::test]
    async fn test_caps_queries_limits_and_snippets() {
        let long = "s".repeat(MAX_SNIPPET_CHARS + 100);
        let primary = Arc::new(
            MockSearcher::new("primary").with_hits("q0", vec![DocHit::new("https://x/0").with_content(long)]),
        );
        let discovery = DocDiscovery::new(primary.clone(), Arc::new(MockSearcher::new("fallback")));
        let many: Vec<String> = (0..8).map(|i| format!("q{i}")).collect();

        let result = discovery.discover(&many).await;

        assert_eq!(primary.calls().len(), MAX_QUERIES);
        assert_eq!(primary.calls()[0], ("q0".to_string(), PRIMARY_RESULTS_PER_QUERY));
        assert_eq!(result.results[0].content.len(), MAX_SNIPPET_CHARS);
    }

    #[tokio::test]
    async fn test_no_queries_no_results() {
        let primary = Arc::new(MockSearcher::new("primary"));
        let discovery = DocDiscovery::new(primary.clone(), Arc::new(MockSearcher::new("fallback")));
        assert!(discovery.discover(&[]).await.is_empty());
        assert!(primary.calls().is_empty());
    }
}
