//! Error types for the Digm domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; the top-level [`Error`]
//! carries only what a request can actually fail with.

use thiserror::Error;

/// The top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid credential. Never carries the underlying cause.
    #[error("Authentication failed")]
    Unauthenticated,

    /// The caller's identity does not own the requested resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // --- Collaborator errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<AuthError> for Error {
    fn from(_: AuthError) -> Self {
        Error::Unauthenticated
    }
}

// --- Collaborator errors ---

/// Failures from the language-model provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned an empty completion")]
    EmptyResponse,
}

/// Failures from the record store. Recovered locally by the context fetcher.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Store returned status {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("Failed to decode store rows: {0}")]
    Decode(String),

    #[error("Store query timed out: {0}")]
    Timeout(String),

    #[error("Store not configured: {0}")]
    NotConfigured(String),
}

/// Failures from the auth collaborator. All collapse to [`Error::Unauthenticated`].
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer credential supplied")]
    MissingCredential,

    #[error("Credential rejected: {0}")]
    InvalidCredential(String),

    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
}
