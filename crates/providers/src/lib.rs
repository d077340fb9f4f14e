//! Language-model provider implementations for Digm.
//!
//! All providers implement the `digm_core::Provider` trait.
//! [`router::build_from_config`] selects the backend from configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
