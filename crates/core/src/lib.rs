//! # Digm Core
//!
//! Domain types, collaborator traits, and error definitions for the Digm
//! coaching service. This crate has **no framework dependencies** — it
//! defines the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (auth service, record store, language model)
//! is defined as a trait here. Implementations live in their respective
//! crates. This enables:
//! - Swapping implementations via configuration
//! - Testing the pipeline with fakes instead of live services
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod identity;
pub mod message;
pub mod provider;
pub mod record;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{AuthError, Error, ProviderError, Result, StoreError};
pub use identity::{Authenticator, UserIdentity};
pub use message::{ChatTurn, Message, Role};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
pub use record::{
    MAX_RELEVANT_ITEMS, OnboardingAnswer, Profile, RecordItem, RecordKind, UserContext,
};
pub use store::{RecordFilter, RecordStore, Row, Table};
