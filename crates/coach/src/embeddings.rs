//! Embedding generation for a user's records.
//!
//! Builds one text per goal, task, non-empty journal entry, and the profile
//! vision, then embeds them in a single provider batch. Vectors are
//! counted, not stored.

use digm_core::error::{Error, ProviderError};
use digm_core::provider::{EmbeddingRequest, Provider};
use digm_core::record::RecordKind;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::context::FetchedContext;

/// Result of an embedding run, in the endpoint's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddingOutcome {
    pub message: String,
    pub embeddings_generated: usize,
}

/// Texts to embed for `ctx`, in goal, task, journal, profile order.
pub fn embedding_texts(ctx: &FetchedContext) -> Vec<String> {
    let records = ctx
        .goals
        .iter()
        .chain(&ctx.tasks)
        .chain(&ctx.journals)
        .filter_map(|item| match item.kind {
            RecordKind::Goal | RecordKind::Task => Some(item.search_fields.join(" ")),
            RecordKind::Journal => (!item.content.is_empty()).then(|| item.content.clone()),
        });

    records
        .chain(ctx.user_context.profile.vision())
        .collect()
}

pub struct EmbeddingIndexer {
    provider: Arc<dyn Provider>,
    model: String,
    enabled: bool,
    timeout: Duration,
}

impl EmbeddingIndexer {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        enabled: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            enabled,
            timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Embed everything in `ctx`. Provider failures propagate.
    pub async fn generate(&self, ctx: &FetchedContext) -> Result<EmbeddingOutcome, Error> {
        if !self.enabled {
            return Ok(EmbeddingOutcome {
                message: "Embedding generation is disabled".into(),
                embeddings_generated: 0,
            });
        }

        let inputs = embedding_texts(ctx);
        if inputs.is_empty() {
            debug!("No content to embed");
            return Ok(EmbeddingOutcome {
                message: "No content to embed".into(),
                embeddings_generated: 0,
            });
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            inputs,
        };

        let response = tokio::time::timeout(self.timeout, self.provider.embed(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!("no embeddings within {}s", self.timeout.as_secs()))
            })??;

        let count = response.embeddings.len();
        info!(count, model = %self.model, "Embeddings generated");

        Ok(EmbeddingOutcome {
            message: "Embeddings generated successfully".into(),
            embeddings_generated: count,
        })
    }
}
