//! Authenticators — turn a bearer credential into a [`UserIdentity`].
//!
//! - [`SupabaseAuthenticator`] asks the auth service who the token belongs to
//! - [`JwtAuthenticator`] verifies HS256 access tokens locally with the
//!   project's JWT secret
//! - [`StaticTokenAuthenticator`] maps fixed tokens to user ids (development)

use async_trait::async_trait;
use digm_config::AppConfig;
use digm_core::error::AuthError;
use digm_core::identity::{Authenticator, UserIdentity};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Build the authenticator selected by `config.auth.mode`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    match config.auth.mode.as_str() {
        "supabase" => {
            let url = config.store.supabase_url.as_deref().ok_or_else(|| {
                AuthError::Unavailable("SUPABASE_URL is not set".into())
            })?;
            let key = config.store.supabase_anon_key.as_deref().ok_or_else(|| {
                AuthError::Unavailable("SUPABASE_ANON_KEY is not set".into())
            })?;
            Ok(Arc::new(
                SupabaseAuthenticator::new(url, key)
                    .with_timeout(Duration::from_secs(config.auth.timeout_secs)),
            ))
        }
        "jwt" => {
            let secret = config.auth.jwt_secret.as_deref().ok_or_else(|| {
                AuthError::Unavailable("SUPABASE_JWT_SECRET is not set".into())
            })?;
            Ok(Arc::new(JwtAuthenticator::new(secret)))
        }
        "static" => Ok(Arc::new(StaticTokenAuthenticator::new(
            config.auth.static_tokens.clone(),
        ))),
        other => Err(AuthError::Unavailable(format!("unknown auth mode '{other}'"))),
    }
}

// ── Supabase ──────────────────────────────────────────────────────────────

/// Validates tokens with `GET {url}/auth/v1/user`.
pub struct SupabaseAuthenticator {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    #[serde(default)]
    id: String,
}

impl SupabaseAuthenticator {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }
}

impl std::fmt::Debug for SupabaseAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuthenticator")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Authenticator for SupabaseAuthenticator {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn validate(&self, credential: &str) -> Result<UserIdentity, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {credential}"))
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200 => {
                let user: SupabaseUser = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Unavailable(format!("unreadable user payload: {e}")))?;
                if user.id.is_empty() {
                    return Err(AuthError::InvalidCredential("no user for token".into()));
                }
                Ok(UserIdentity::new(user.id))
            }
            400 | 401 | 403 | 404 => Err(AuthError::InvalidCredential(format!(
                "auth service returned {status}"
            ))),
            _ => Err(AuthError::Unavailable(format!("auth service returned {status}"))),
        }
    }
}

// ── Local JWT ─────────────────────────────────────────────────────────────

/// Audience Supabase stamps on access tokens issued to signed-in users.
const SUPABASE_AUDIENCE: &str = "authenticated";

/// Verifies HS256-signed access tokens without a network round trip.
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: String,
}

impl JwtAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SUPABASE_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.validate_nbf = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidCredential(Self::describe(&e).into()))?;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidCredential("token has no subject".into()));
        }

        Ok(UserIdentity::new(claims.sub))
    }

    fn describe(e: &jsonwebtoken::errors::Error) -> &'static str {
        match e.kind() {
            ErrorKind::ExpiredSignature => "token expired",
            ErrorKind::ImmatureSignature => "token not yet valid",
            ErrorKind::InvalidAudience => "wrong audience",
            ErrorKind::InvalidSignature => "bad signature",
            ErrorKind::InvalidAlgorithm => "unsupported algorithm",
            ErrorKind::MissingRequiredClaim(_) => "missing required claim",
            _ => "malformed token",
        }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    fn name(&self) -> &str {
        "jwt"
    }

    async fn validate(&self, credential: &str) -> Result<UserIdentity, AuthError> {
        self.verify(credential)
    }
}

// ── Static tokens ─────────────────────────────────────────────────────────

/// Maps fixed bearer tokens to user ids. Intended for local development
/// and tests only.
#[derive(Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Add a token → user id mapping.
    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    fn name(&self) -> &str {
        "static"
    }

    async fn validate(&self, credential: &str) -> Result<UserIdentity, AuthError> {
        match self.tokens.get(credential) {
            Some(user_id) => {
                debug!(user_id = %user_id, "Static token accepted");
                Ok(UserIdentity::new(user_id.clone()))
            }
            None => Err(AuthError::InvalidCredential("unknown token".into())),
        }
    }
}
