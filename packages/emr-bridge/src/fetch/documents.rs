use std::sync::Arc;

use tracing::{info, warn};

use crate::text::{cap_with_marker, truncate_chars};
use crate::traits::fetcher::DocFetcher;
use crate::types::{FetchedDoc, FetchedDocs};

/// URLs considered per run.
pub const MAX_DOCS: usize = 10;
/// Characters kept per fetched page.
pub const MAX_DOC_CHARS: usize = 80_000;
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Characters of each document included in the joined text.
pub const JOINED_DOC_CHARS: usize = 15_000;
pub const MAX_JOINED_CHARS: usize = 100_000;
pub const NO_DOCS_FETCHED: &str = "(no docs fetched)";
pub const NO_CONTENT: &str = "(no content)";

/// Fetches an ordered URL list, skipping failures.
pub struct DocumentFetch {
    fetcher: Arc<dyn DocFetcher>,
    max_docs: usize,
}

impl DocumentFetch {
    pub fn new(fetcher: Arc<dyn DocFetcher>) -> Self {
        Self {
            fetcher,
            max_docs: MAX_DOCS,
        }
    }

    pub fn with_max_docs(mut self, max_docs: usize) -> Self {
        self.max_docs = max_docs;
        self
    }

    /// Fetch the first `max_docs` URLs in order. Only `http(s)` URLs are tried.
    pub async fn fetch_all(&self, urls: &[String]) -> FetchedDocs {
        let considered = &urls[..urls.len().min(self.max_docs)];
        let mut docs = Vec::new();

        for url in considered {
            if !url.starts_with("http") {
                continue;
            }
            match self.fetcher.fetch(url).await {
                Ok(content) => {
                    let content = cap_with_marker(&content, MAX_DOC_CHARS, TRUNCATION_MARKER);
                    info!(url = %truncate_chars(url, 60), chars = content.len(), "Fetched doc");
                    docs.push(FetchedDoc {
                        url: url.clone(),
                        content,
                    });
                }
                Err(e) => {
                    warn!(url = %truncate_chars(url, 50), error = %e, "Doc fetch failed");
                }
            }
        }

        info!(urls = considered.len(), docs = docs.len(), "Doc fetch complete");
        FetchedDocs { docs }
    }
}

/// Concatenate fetched docs into the text handed to the plan synthesizer.
pub fn join_docs(docs: &FetchedDocs) -> String {
    if docs.is_empty() {
        return NO_CONTENT.to_string();
    }
    let joined = docs
        .docs
        .iter()
        .map(|d| {
            format!(
                "--- URL: {} ---\n{}",
                d.url,
                truncate_chars(&d.content, JOINED_DOC_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, MAX_JOINED_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_skips_failures_and_non_http() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_page("https://a", "alpha")
                .with_page("https://c", "gamma")
                .fail_url("https://b"),
        );
        let fetch = DocumentFetch::new(fetcher.clone());

        let docs = fetch
            .fetch_all(&urls(&["https://a", "mailto:x@y", "https://b", "https://c"]))
            .await;

        let fetched: Vec<_> = docs.docs.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(fetched, vec!["https://a", "https://c"]);
        assert_eq!(fetcher.calls(), vec!["https://a", "https://b", "https://c"]);
    }

    #[tokio::test]
    async fn test_caps_url_count() {
        let fetcher = Arc::new(MockFetcher::new());
        let fetch = DocumentFetch::new(fetcher.clone());
        let many: Vec<String> = (0..15).map(|i| format!("https://x/{i}")).collect();

        fetch.fetch_all(&many).await;

        assert_eq!(fetcher.calls().len(), MAX_DOCS);
    }

    #[tokio::test]
    async fn test_long_content_gets_marker() {
        let fetcher = Arc::new(MockFetcher::new().with_page("https://a", "x".repeat(MAX_DOC_CHARS + 5)));
        let docs = DocumentFetch::new(fetcher).fetch_all(&urls(&["https://a"])).await;

        let content = &docs.docs[0].content;
        assert!(content.ends_with(TRUNCATION_MARKER));
        assert_eq!(content.len(), MAX_DOC_CHARS + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_join_docs() {
        let docs = FetchedDocs {
            docs: vec![
                FetchedDoc { url: "https://a".into(), content: "alpha".into() },
                FetchedDoc { url: "https://b".into(), content: "b".repeat(JOINED_DOC_CHARS + 10) },
            ],
        };

        let joined = join_docs(&docs);

        assert!(joined.starts_with("--- URL: https://a ---\nalpha\n\n--- URL: https://b ---\n"));
        assert_eq!(
            joined.len(),
            "--- URL: https://a ---\nalpha\n\n--- URL: https://b ---\n".len() + JOINED_DOC_CHARS
        );
    }

    #[test]
    fn test_join_docs_empty() {
        assert_eq!(join_docs(&FetchedDocs::default()), NO_CONTENT);
    }
}
