//! EMR Integration Planner and Executor
//!
//! Discovers an EMR vendor's REST API documentation, asks a language model for
//! a request plan that moves a FHIR bundle into (and out of) that EMR, and
//! replays the plan with credentials resolved per call.
//!
//! # Usage
//!
//! ```rust,ignore
//! use emr_bridge::{DocDiscovery, DocumentFetch, MappingPipeline, MemoryStore, PipelineInput};
//!
//! let pipeline = MappingPipeline::new(generators, discovery, fetch, Arc::new(MemoryStore::new()));
//! let outcome = pipeline
//!     .run(PipelineInput::new("https://docs.acme-emr.example", bundle).with_emr_id("acme"))
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`pipeline`] - Query synthesis, discovery, fetch, plan synthesis, persistence
//! - [`mapping`] - `{{path}}` body templates over a FHIR bundle
//! - [`auth`] - Credential broker and token cache
//! - [`executor`] - Replays a plan against an EMR
//! - [`stores`] - Bundle and mapping storage
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod auth;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod mapping;
pub mod pipeline;
pub mod search;
pub mod security;
pub mod stores;
pub mod testing;
pub mod text;
pub mod traits;
pub mod transport;
pub mod types;

pub use ai::{LlmGenerator, LlmGeneratorFactory};
pub use auth::{CredentialBroker, TokenCache};
pub use config::{BridgeConfig, DomainDefaults};
pub use error::{AuthError, BridgeError, FetchError, Result, TransportError};
pub use executor::{ExecutionOutcome, PlanExecutor};
pub use fetch::{DocumentFetch, HttpFetcher};
pub use pipeline::{MappingPipeline, PlanRefiner, PlanSynthesizer, RefineOutcome};
pub use search::{DocDiscovery, DuckDuckGoSearcher, TavilySearcher};
pub use security::{ModelCredentials, SecretString};
pub use stores::MemoryStore;
pub use traits::{
    clock::{Clock, SystemClock},
    fetcher::DocFetcher,
    generator::{GeneratorFactory, TextGenerator},
    searcher::DocSearcher,
    store::{BundleStore, PlanStore, StoredBundle, StoredMapping},
    transport::{HttpRequest, HttpResponse, HttpTransport},
};
pub use transport::ReqwestTransport;
pub use types::{
    CredentialDomain, CredentialParams, Direction, HttpMethod, PipelineInput, PipelineOutcome,
    RequestPlan, RequestSpec, ResolvedCredentials,
};

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;
