//! The coaching pipeline — the heart of Digm.
//!
//! A coaching query flows through five stages:
//!
//! 1. **Resolve identity**: exchange the bearer credential for a user id (fails closed)
//! 2. **Fetch context**: profile, onboarding answers, goals, tasks, and journal
//!    entries, concurrently, each source degrading to empty on failure
//! 3. **Select**: narrow the records to at most ten, by category priority or
//!    by substring search
//! 4. **Compose**: build the system instruction and the ordered message sequence
//! 5. **Generate**: call the language model, falling back to a fixed reply
//!
//! [`CoachPipeline`] wires the stages together. Every collaborator is
//! injected, so tests substitute fakes.

pub mod context;
pub mod embeddings;
pub mod generator;
pub mod identity;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{
    ComposedPrompt, ContextFetcher, FetchedContext, MAX_RELEVANT_ITEMS, PromptContext,
    RelevanceSelector, SelectionStrategy, compose, estimate_messages_tokens, estimate_tokens,
};
pub use embeddings::{EmbeddingIndexer, EmbeddingOutcome};
pub use generator::{FALLBACK_RESPONSE, GenerationSettings, ResponseGenerator};
pub use identity::{IdentityResolver, bearer_token};
pub use pipeline::{CoachAnswer, CoachPipeline, MAX_SEARCH_RESULTS, SearchResults};
