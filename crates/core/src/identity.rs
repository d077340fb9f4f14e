//! Caller identity and the auth collaborator contract.
//!
//! A [`UserIdentity`] is produced once per request by exchanging the bearer
//! credential with an [`Authenticator`]. Every downstream stage is keyed
//! by it; nothing in the service persists it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Opaque, stable user identifier issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identity owns the resource keyed by `owner_id`.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.0 == owner_id
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The auth collaborator: validates a bearer credential.
///
/// Implementations: Supabase user lookup, local JWT verification, static tokens.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// A short name for logs (e.g., "supabase", "jwt").
    fn name(&self) -> &str;

    /// Exchange a credential for the identity it was issued to.
    async fn validate(&self, credential: &str) -> std::result::Result<UserIdentity, AuthError>;
}
