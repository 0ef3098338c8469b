//! Persistence traits for FHIR bundles and synthesized mappings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::types::RequestSpec;

/// A stored FHIR bundle.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBundle {
    pub id: Uuid,
    pub bundle: Value,
    pub patient_id: Option<String>,
    pub encounter_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted request plan for one EMR.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMapping {
    pub emr_id: String,
    pub push_fhir: Vec<RequestSpec>,
    pub get_fhir: Vec<RequestSpec>,
    pub api_doc_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Source of FHIR bundles.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Oldest stored bundle, if any.
    async fn get_first_bundle(&self) -> Result<Option<StoredBundle>>;

    async fn get_bundle_by_id(&self, id: Uuid) -> Result<Option<StoredBundle>>;

    /// Store a bundle, recording the first Patient and Encounter ids found.
    async fn insert_bundle(&self, bundle: Value) -> Result<Uuid>;
}

/// Persistence for synthesized plans, keyed by EMR id.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn upsert_mapping(
        &self,
        emr_id: &str,
        push_fhir: &[RequestSpec],
        get_fhir: &[RequestSpec],
        api_doc_url: Option<&str>,
    ) -> Result<()>;

    async fn get_mapping(&self, emr_id: &str) -> Result<Option<StoredMapping>>;
}
