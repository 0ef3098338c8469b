//! Document fetch trait.

use async_trait::async_trait;

use crate::error::FetchResult;

/// Retrieves the raw text of one documentation page.
#[async_trait]
pub trait DocFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}
