//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use emr_bridge::{
    BridgeConfig, BundleStore, CredentialBroker, DocDiscovery, DocumentFetch, DuckDuckGoSearcher,
    HttpFetcher, LlmGeneratorFactory, MappingPipeline, PlanExecutor, PlanStore, ReqwestTransport,
    TavilySearcher,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::{
    create_bundle_handler, execute_handler, get_bundle_handler, health_handler, mapping_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MappingPipeline>,
    pub executor: Arc<PlanExecutor>,
    pub broker: Arc<CredentialBroker>,
    pub bundles: Arc<dyn BundleStore>,
    pub plans: Arc<dyn PlanStore>,
}

impl AppState {
    /// Wire the live backends around one store.
    pub fn new<S>(config: &BridgeConfig, store: Arc<S>) -> Self
    where
        S: BundleStore + PlanStore + 'static,
    {
        let transport = Arc::new(ReqwestTransport::new());
        let discovery = DocDiscovery::new(
            Arc::new(TavilySearcher::new(config.tavily_api_key.clone())),
            Arc::new(DuckDuckGoSearcher::new()),
        );
        let pipeline = MappingPipeline::new(
            Arc::new(LlmGeneratorFactory::from_config(config)),
            discovery,
            DocumentFetch::new(Arc::new(HttpFetcher::new())),
            store.clone(),
        );

        Self {
            pipeline: Arc::new(pipeline),
            executor: Arc::new(PlanExecutor::new(transport.clone())),
            broker: Arc::new(CredentialBroker::new(config, transport)),
            bundles: store.clone(),
            plans: store,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/agent/mapping", post(mapping_handler))
        .route("/api/agent/execute", post(execute_handler))
        .route("/api/bundles", post(create_bundle_handler))
        .route("/api/bundles/:id", get(get_bundle_handler))
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
