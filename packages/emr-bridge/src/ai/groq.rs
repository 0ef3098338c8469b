use std::sync::Arc;

use async_trait::async_trait;
use llm_client::{ChatRequest, LlmClient, Message};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::security::{ModelCredentials, SecretString};
use crate::traits::generator::{GeneratorFactory, TextGenerator};
use crate::types::ModelOverrides;

pub const GENERATION_TEMPERATURE: f32 = 0.2;

/// [`TextGenerator`] backed by a chat-completions endpoint.
pub struct LlmGenerator {
    client: LlmClient,
    model: String,
    temperature: f32,
}

impl LlmGenerator {
    pub fn new(credentials: &ModelCredentials) -> Self {
        let mut client = LlmClient::new(credentials.api_key.expose());
        if let Some(base_url) = &credentials.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Self {
            client,
            model: credentials.model.clone(),
            temperature: GENERATION_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(self.temperature);

        let response = self.client.chat_completion(request).await?;
        debug!(model = %self.model, chars = response.content.len(), "Generated text");
        Ok(response.content)
    }
}

/// Builds an [`LlmGenerator`] per run from configuration plus overrides.
pub struct LlmGeneratorFactory {
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
}

impl LlmGeneratorFactory {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            api_key: config.groq_api_key.clone(),
            model: config.groq_model.clone(),
            base_url: config.groq_base_url.clone(),
        }
    }

    /// Credentials for a run, overrides taking precedence.
    pub fn credentials(&self, overrides: &ModelOverrides) -> Result<ModelCredentials> {
        let api_key = overrides
            .api_key
            .as_ref()
            .filter(|k| !k.is_blank())
            .or(self.api_key.as_ref())
            .ok_or_else(|| BridgeError::Config("GROQ_API_KEY not set".to_string()))?;
        let model = overrides
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.model.as_str());

        Ok(ModelCredentials::new(api_key.expose(), model).with_base_url(self.base_url.clone()))
    }
}

impl GeneratorFactory for LlmGeneratorFactory {
    fn generator(&self, overrides: &ModelOverrides) -> Result<Arc<dyn TextGenerator>> {
        let credentials = self.credentials(overrides)?;
        Ok(Arc::new(LlmGenerator::new(&credentials)))
    }
}
