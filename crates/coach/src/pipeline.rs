//! The coaching pipeline: fetch → select → compose → generate.
//!
//! Identity resolution happens before any of this (see
//! [`IdentityResolver`]); every operation here takes an already
//! authenticated [`UserIdentity`].

use digm_config::AppConfig;
use digm_core::error::Error;
use digm_core::identity::{Authenticator, UserIdentity};
use digm_core::message::ChatTurn;
use digm_core::provider::Provider;
use digm_core::record::{RecordItem, UserContext};
use digm_core::store::RecordStore;
use digm_security::audit::{AuditEvent, AuditLogger, AuditOutcome};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::context::selector::{SelectionStrategy, search};
use crate::context::{ContextFetcher, PromptContext, RelevanceSelector, compose};
use crate::embeddings::{EmbeddingIndexer, EmbeddingOutcome};
use crate::generator::{GenerationSettings, ResponseGenerator};
use crate::identity::IdentityResolver;

/// Largest page the standalone search returns.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// The answer to a coaching query, in the endpoint's wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct CoachAnswer {
    pub response: String,
    pub relevant_data: Vec<RecordItem>,
    pub user_context: UserContext,
}

/// Search results, in the endpoint's wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<RecordItem>,
    pub total: usize,
}

pub struct CoachPipeline {
    resolver: IdentityResolver,
    fetcher: ContextFetcher,
    selector: RelevanceSelector,
    generator: ResponseGenerator,
    indexer: EmbeddingIndexer,
}

impl CoachPipeline {
    pub fn new(
        resolver: IdentityResolver,
        fetcher: ContextFetcher,
        selector: RelevanceSelector,
        generator: ResponseGenerator,
        indexer: EmbeddingIndexer,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            selector,
            generator,
            indexer,
        }
    }

    /// Wire the stages from configuration and the shared collaborators.
    pub fn from_config(
        config: &AppConfig,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn Provider>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        let strategy = config
            .selection
            .strategy
            .parse()
            .unwrap_or(SelectionStrategy::Default);
        let provider_timeout = Duration::from_secs(config.provider.timeout_secs);

        let auth_timeout = Duration::from_secs(config.auth.timeout_secs);

        Self::new(
            IdentityResolver::new(authenticator, audit, auth_timeout),
            ContextFetcher::new(store, Duration::from_secs(config.store.timeout_secs)),
            RelevanceSelector::new(strategy, config.selection.limit),
            ResponseGenerator::new(provider.clone(), GenerationSettings::from_config(config)),
            EmbeddingIndexer::new(
                provider,
                config.provider.embedding_model.clone(),
                config.embeddings.enabled,
                provider_timeout,
            ),
        )
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        self.generator.provider()
    }

    /// Answer a coaching query for `user`.
    ///
    /// Never fails: unavailable sources shrink the context and a failed
    /// model call yields the fallback text.
    pub async fn answer(
        &self,
        user: &UserIdentity,
        message: &str,
        history: &[ChatTurn],
    ) -> CoachAnswer {
        let fetched = self.fetcher.fetch(user).await;
        let relevant_data = self
            .selector
            .select(&fetched.goals, &fetched.tasks, &fetched.journals, message);

        let prompt = compose(
            &PromptContext {
                profile: &fetched.user_context.profile,
                onboarding: &fetched.user_context.onboarding,
                items: &relevant_data,
            },
            message,
            history,
        );

        let response = self.generator.generate(&prompt).await;

        info!(
            user_id = %user,
            records = fetched.record_count(),
            selected = relevant_data.len(),
            history_turns = history.len(),
            "Coach query answered"
        );

        CoachAnswer {
            response,
            relevant_data,
            user_context: fetched.user_context,
        }
    }

    /// Substring search over the user's records. `limit` is clamped to
    /// `1..=MAX_SEARCH_RESULTS`.
    pub async fn search(&self, user: &UserIdentity, query: &str, limit: usize) -> SearchResults {
        let (goals, tasks, journals) = self.fetcher.fetch_records(user).await;
        let results = search(&goals, &tasks, &journals, query, limit.clamp(1, MAX_SEARCH_RESULTS));
        info!(user_id = %user, count = results.len(), "Search completed");
        SearchResults {
            total: results.len(),
            results,
        }
    }

    /// Generate embeddings for `requested_user_id`, which must be `user`.
    pub async fn generate_embeddings(
        &self,
        user: &UserIdentity,
        requested_user_id: &str,
    ) -> Result<EmbeddingOutcome, Error> {
        if !user.owns(requested_user_id) {
            warn!(
                user_id = %user,
                requested = requested_user_id,
                "Embedding request for another user's data"
            );
            self.resolver.audit().log(
                AuditEvent::OwnershipDenied {
                    resource: format!("embeddings:{requested_user_id}"),
                },
                user.as_str(),
                "/api/embeddings/generate",
                AuditOutcome::Denied,
                None,
            );
            return Err(Error::Forbidden(
                "Can only generate embeddings for your own data".into(),
            ));
        }

        if !self.indexer.is_enabled() {
            return self.indexer.generate(&Default::default()).await;
        }

        let fetched = self.fetcher.fetch(user).await;
        self.indexer.generate(&fetched).await
    }
}
