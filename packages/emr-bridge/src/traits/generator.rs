//! Text-generation backend traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ModelOverrides;

/// A single request/response text-generation call.
///
/// The returned text may or may not be JSON wrapped in a code fence.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Builds a generator for one pipeline run, honoring per-run overrides.
///
/// Returns a `Config` error when no API key is available.
pub trait GeneratorFactory: Send + Sync {
    fn generator(&self, overrides: &ModelOverrides) -> Result<Arc<dyn TextGenerator>>;
}
