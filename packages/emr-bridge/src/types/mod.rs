//! Core domain types.

pub mod bundle;
pub mod credentials;
pub mod docs;
pub mod plan;
pub mod state;

pub use credentials::{CredentialDomain, CredentialParams, CredentialSource, ResolvedCredentials};
pub use docs::{DocHit, DocSearchResult, FetchedDoc, FetchedDocs, SearchQueries};
pub use plan::{Direction, HttpMethod, RequestPlan, RequestSpec};
pub use state::{ModelOverrides, PipelineInput, PipelineOutcome, PipelineState, StateDelta};
