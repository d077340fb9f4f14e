//! Response generation — the language-model call, with graceful degradation.
//!
//! Any provider failure (error, timeout, empty reply) becomes
//! [`FALLBACK_RESPONSE`]. The user always gets an answer from this stage.

use digm_config::AppConfig;
use digm_core::error::ProviderError;
use digm_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::context::ComposedPrompt;
use crate::context::token::estimate_messages_tokens;

/// Returned in place of a generated answer when the model call fails.
pub const FALLBACK_RESPONSE: &str =
    "I'm having trouble processing your request right now. Please try again later.";

/// Fixed generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            temperature: 0.7,
            max_tokens: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            timeout: Duration::from_secs(config.provider.timeout_secs),
        }
    }
}

pub struct ResponseGenerator {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Generate a reply, or the fallback text on any failure.
    pub async fn generate(&self, prompt: &ComposedPrompt) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "Generation failed, using fallback response"
                );
                FALLBACK_RESPONSE.to_string()
            }
        }
    }

    /// One bounded attempt at the model call. No retries.
    pub async fn try_generate(&self, prompt: &ComposedPrompt) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages: prompt.messages.clone(),
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            estimated_tokens = estimate_messages_tokens(&request.messages),
            "Requesting completion"
        );

        let response = tokio::time::timeout(self.settings.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!(
                    "no completion within {}s",
                    self.settings.timeout.as_secs()
                ))
            })??;

        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        Ok(text)
    }
}
