//! Context assembly: fetch → render → select → compose.
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | Fetch | user id | profile, onboarding, raw rows |
//! | Render | raw rows | [`RecordItem`](digm_core::RecordItem)s with readable `content` |
//! | Select | goals, tasks, journals, query | ≤ 10 items |
//! | Compose | everything above + chat history | [`ComposedPrompt`] |

pub mod fetcher;
pub mod prompt;
pub mod render;
pub mod selector;
pub mod token;

pub use fetcher::{ContextFetcher, FetchedContext};
pub use prompt::{ComposedPrompt, PromptContext, compose};
pub use selector::{MAX_RELEVANT_ITEMS, RelevanceSelector, SelectionStrategy};
pub use token::{estimate_messages_tokens, estimate_tokens};
