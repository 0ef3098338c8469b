//! Document search backend trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::DocHit;

/// A documentation search backend (Tavily, DuckDuckGo, ...).
///
/// Discovery calls `search` once per query and isolates failures per call,
/// so implementations should simply return an error for a failed request.
#[async_trait]
pub trait DocSearcher: Send + Sync {
    /// Search for pages relevant to the query, returning at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocHit>>;

    /// An unconfigured backend is skipped and treated as returning nothing.
    fn is_configured(&self) -> bool {
        true
    }

    /// Backend name for logs.
    fn name(&self) -> &str;
}
