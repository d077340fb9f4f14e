//! Identity resolution — the authentication gate in front of every data access.
//!
//! Fails closed: a missing credential, a rejected credential, an auth
//! service error, and a timeout all become [`Error::Unauthenticated`]. The
//! cause is logged and audited but never returned to the caller.

use digm_core::error::{AuthError, Error};
use digm_core::identity::{Authenticator, UserIdentity};
use digm_security::audit::{AuditEvent, AuditLogger, AuditOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively; a blank token is treated as absent.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Exchanges bearer credentials for user identities.
pub struct IdentityResolver {
    authenticator: Arc<dyn Authenticator>,
    audit: Arc<AuditLogger>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        audit: Arc<AuditLogger>,
        timeout: Duration,
    ) -> Self {
        Self {
            authenticator,
            audit,
            timeout,
        }
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    /// Resolve `credential` for a request to `target` (used for auditing).
    ///
    /// No retries: the first failure is final.
    pub async fn resolve(
        &self,
        credential: Option<&str>,
        target: &str,
    ) -> Result<UserIdentity, Error> {
        let outcome = match credential.map(str::trim).filter(|c| !c.is_empty()) {
            None => Err(AuthError::MissingCredential),
            Some(credential) => {
                let validation = self.authenticator.validate(credential);
                match tokio::time::timeout(self.timeout, validation).await {
                    Ok(result) => result,
                    Err(_) => Err(AuthError::Unavailable(format!(
                        "{} did not answer within {}ms",
                        self.authenticator.name(),
                        self.timeout.as_millis()
                    ))),
                }
            }
        };

        match outcome {
            Ok(identity) => {
                debug!(
                    user_id = %identity,
                    authenticator = self.authenticator.name(),
                    "Caller authenticated"
                );
                self.audit.log(
                    AuditEvent::AuthSuccess,
                    identity.as_str(),
                    target,
                    AuditOutcome::Success,
                    None,
                );
                Ok(identity)
            }
            Err(e) => {
                warn!(endpoint = target, error = %e, "Authentication failed");
                let outcome = match e {
                    AuthError::Unavailable(_) => AuditOutcome::Failure,
                    _ => AuditOutcome::Denied,
                };
                self.audit.log(
                    AuditEvent::AuthFailure,
                    "anonymous",
                    target,
                    outcome,
                    Some(e.to_string()),
                );
                Err(Error::Unauthenticated)
            }
        }
    }
}
