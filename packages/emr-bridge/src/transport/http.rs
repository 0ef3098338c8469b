use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::traits::transport::{HttpRequest, HttpResponse, HttpTransport};

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|_| TransportError::Request {
                url: url.clone(),
                message: format!("unsupported method {method}"),
            })?;
        let parsed = url::Url::parse(&url).map_err(|_| TransportError::InvalidUrl { url: url.clone() })?;

        let mut builder = self.client.request(method.clone(), parsed).timeout(timeout);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        debug!(method = %method, url = %url, "Sending request");
        let response = builder.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed");
            if e.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;

        debug!(url = %url, status, bytes = text.len(), "Response received");
        Ok(HttpResponse::new(status, text))
    }
}
