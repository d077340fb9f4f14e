//! Shared test helpers for pipeline tests.

use async_trait::async_trait;
use digm_core::error::ProviderError;
use digm_core::message::Message;
use digm_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
};
use std::sync::Mutex;
use std::time::Duration;

/// A provider that answers every completion with a fixed result and
/// records the requests it saw.
pub struct ScriptedProvider {
    reply: Result<String, ProviderError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProviderRequest>>,
    embed_inputs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Self {
        Self::with_result(Ok(text.to_string()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(reply: Result<String, ProviderError>) -> Self {
        Self {
            reply,
            delay: None,
            requests: Mutex::new(Vec::new()),
            embed_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn embed_inputs(&self) -> Vec<Vec<String>> {
        self.embed_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let count = request.inputs.len();
        self.embed_inputs.lock().unwrap().push(request.inputs);
        self.reply.clone().map(|_| EmbeddingResponse {
            embeddings: vec![vec![0.0; 4]; count],
            model: request.model,
            usage: None,
        })
    }
}
