//! Credential broker: static tokens, client-credential login exchange, and a
//! process-wide token cache.

mod broker;
mod cache;
mod exchange;

pub use broker::CredentialBroker;
pub use cache::{CacheKey, CachedToken, TokenCache, EXPIRY_MARGIN_SECS};
pub use exchange::{
    LoginExchange, LoginToken, DEFAULT_EXPIRES_IN_SECS, LOGIN_PATH, LOGIN_TIMEOUT, MAX_EXPIRES_IN_SECS,
};
