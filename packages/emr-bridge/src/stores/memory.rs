//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::store::{BundleStore, PlanStore, StoredBundle, StoredMapping};
use crate::types::{bundle, RequestSpec};

/// In-memory storage for bundles and mappings.
///
/// Data is lost on restart.
pub struct MemoryStore {
    bundles: RwLock<Vec<StoredBundle>>,
    mappings: RwLock<HashMap<String, StoredMapping>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            bundles: RwLock::new(Vec::new()),
            mappings: RwLock::new(HashMap::new()),
        }
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.read().unwrap().len()
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.read().unwrap().len()
    }
}

#[async_trait]
impl BundleStore for MemoryStore {
    async fn get_first_bundle(&self) -> Result<Option<StoredBundle>> {
        Ok(self
            .bundles
            .read()
            .unwrap()
            .iter()
            .min_by_key(|b| b.created_at)
            .cloned())
    }

    async fn get_bundle_by_id(&self, id: Uuid) -> Result<Option<StoredBundle>> {
        Ok(self
            .bundles
            .read()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn insert_bundle(&self, value: Value) -> Result<Uuid> {
        let stored = StoredBundle {
            id: Uuid::new_v4(),
            patient_id: bundle::first_resource_id(&value, "Patient"),
            encounter_id: bundle::first_resource_id(&value, "Encounter"),
            bundle: value,
            created_at: Utc::now(),
        };
        let id = stored.id;
        self.bundles.write().unwrap().push(stored);
        Ok(id)
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn upsert_mapping(
        &self,
        emr_id: &str,
        push_fhir: &[RequestSpec],
        get_fhir: &[RequestSpec],
        api_doc_url: Option<&str>,
    ) -> Result<()> {
        let mapping = StoredMapping {
            emr_id: emr_id.to_string(),
            push_fhir: push_fhir.to_vec(),
            get_fhir: get_fhir.to_vec(),
            api_doc_url: api_doc_url.map(str::to_string),
            updated_at: Utc::now(),
        };
        self.mappings
            .write()
            .unwrap()
            .insert(emr_id.to_string(), mapping);
        Ok(())
    }

    async fn get_mapping(&self, emr_id: &str) -> Result<Option<StoredMapping>> {
        Ok(self.mappings.read().unwrap().get(emr_id).cloned())
    }
}
