//! Typed errors for the EMR bridge library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! configuration problem (fatal to the operation) from an upstream failure
//! (recovered with a degraded fallback).

use thiserror::Error;

/// Errors that can occur in bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or unusable configuration (credentials, model key)
    #[error("config error: {0}")]
    Config(String),

    /// Caller supplied input the operation cannot start from
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Document search backend failed
    #[error("search error: {0}")]
    Search(String),

    /// Document fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Text-generation backend failed
    #[error("generation error: {0}")]
    Generation(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credential resolution or token exchange failed
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// HTTP transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BridgeError {
    /// Configuration errors are fatal to the operation and never retried.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<llm_client::LlmError> for BridgeError {
    fn from(err: llm_client::LlmError) -> Self {
        match err {
            llm_client::LlmError::Config(msg) => Self::Config(msg),
            other => Self::Generation(other.to_string()),
        }
    }
}

/// Errors that can occur while fetching a document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is not http(s)
    #[error("disallowed URL scheme: {url}")]
    DisallowedScheme { url: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Deadline elapsed
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Errors from the login exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    /// client_id / client_secret present but blank
    #[error("client_id and client_secret must be non-empty")]
    EmptyClientCredentials,

    /// Login endpoint answered with a non-success status
    #[error("login failed with HTTP {status}: {body}")]
    LoginRejected { status: u16, body: String },

    /// Login response did not carry a token
    #[error("login response missing access_token")]
    MissingAccessToken,

    /// Login call itself failed
    #[error("login transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised by an [`HttpTransport`](crate::traits::transport::HttpTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection or protocol failure
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Deadline elapsed
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Response body could not be read
    #[error("failed reading body from {url}: {message}")]
    Body { url: String, message: String },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for auth operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
