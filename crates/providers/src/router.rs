//! Provider selection — builds the configured LLM backend.

use digm_config::AppConfig;
use digm_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider named in `config.provider`.
///
/// Every supported backend speaks the OpenAI wire format; only the base URL
/// and key differ.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let name = config.provider.name.as_str();
    let base_url = config
        .provider
        .base_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));
    let api_key = config.api_key.clone().unwrap_or_default();

    tracing::debug!(provider = name, base_url = %base_url, "Building provider");

    let provider = if name == "ollama" && api_key.is_empty() {
        OpenAiCompatProvider::ollama(Some(&base_url))
    } else {
        OpenAiCompatProvider::new(name, &base_url, &api_key)
    };

    Arc::new(provider.with_timeout(Duration::from_secs(config.provider.timeout_secs)))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
