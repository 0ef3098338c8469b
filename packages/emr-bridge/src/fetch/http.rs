use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::DocFetcher;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(25);

/// Plain HTTP GET fetcher. Follows redirects; any non-2xx status is a failure.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: "emr-bridge/0.1".to_string(),
            timeout: FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[async_trait]
impl DocFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::DisallowedScheme { url: url.to_string() });
        }

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout { url: url.to_string() }
                } else {
                    FetchError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        debug!(url = %url, chars = text.len(), "Fetched document");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let err = HttpFetcher::new().fetch("ftp://docs.example/api").await.unwrap_err();
        assert!(matches!(err, FetchError::DisallowedScheme { .. }));
    }
}
