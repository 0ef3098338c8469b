//! Pure OpenAI-compatible chat completions client
//!
//! A minimal client for any provider exposing the `/chat/completions` REST shape
//! (Groq by default, OpenAI, local proxies). No domain-specific logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_client::{LlmClient, ChatRequest, Message};
//!
//! let client = LlmClient::from_env()?;
//!
//! let response = client.chat_completion(
//!     ChatRequest::new("llama-3.3-70b-versatile")
//!         .message(Message::system("Answer in JSON."))
//!         .message(Message::user("Hello!"))
//!         .temperature(0.2),
//! ).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{LlmError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// Groq's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct LlmClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variable `GROQ_API_KEY` (and optional `GROQ_BASE_URL`).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::Config("GROQ_API_KEY not set".into()))?;

        let mut client = Self::new(api_key.trim());
        if let Ok(base_url) = std::env::var("GROQ_BASE_URL") {
            if !base_url.trim().is_empty() {
                client = client.with_base_url(base_url.trim());
            }
        }
        Ok(client)
    }

    /// Set a custom base URL (OpenAI, Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom HTTP client.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Send messages to the chat completion API and get the first choice back.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat completion request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Chat completion API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| LlmError::Parse("response contained no choices".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "Chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: raw.usage,
        })
    }

    /// Single system + user turn, returning the raw text.
    pub async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest::new(model)
            .message(Message::system(system))
            .message(Message::user(user))
            .temperature(temperature);

        Ok(self.chat_completion(request).await?.content)
    }
}
