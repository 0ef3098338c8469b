// Main entry point for the EMR bridge server

use std::sync::Arc;

use anyhow::{Context, Result};
use emr_bridge::{CredentialDomain, MemoryStore, PostgresStore};
use emr_bridge_server::{build_app, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,emr_bridge=debug,emr_bridge_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EMR bridge server");

    let config = Config::from_env().context("Failed to load configuration")?;
    for domain in [CredentialDomain::Scribe, CredentialDomain::Emr] {
        if let Err(e) = config.bridge.domain(domain).validate() {
            tracing::warn!(domain = %domain, error = %e, "Credential defaults incomplete");
        }
    }
    if config.bridge.groq_api_key.is_none() {
        tracing::warn!("GROQ_API_KEY not set; mapping runs need a per-request key");
    }

    let state = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = PostgresStore::new(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");
            AppState::new(&config.bridge, Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            AppState::new(&config.bridge, Arc::new(MemoryStore::new()))
        }
    };

    let app = build_app(state, &config.cors_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
