use anyhow::{Context, Result};
use dotenvy::dotenv;
use emr_bridge::BridgeConfig;
use std::env;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Postgres store when set, in-memory otherwise.
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: match env::var("PORT") {
                Ok(port) if !port.trim().is_empty() => {
                    port.trim().parse().context("PORT must be a valid number")?
                }
                _ => DEFAULT_PORT,
            },
            database_url: env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            cors_origins: parse_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            bridge: BridgeConfig::from_env(),
        })
    }
}

/// `*` or a comma-separated origin list.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://a.example/, http://b.example,,"),
            vec!["http://a.example", "http://b.example"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert!(parse_origins(" ").is_empty());
    }
}
