//! Security module for Digm — credential validation and audit logging.
//!
//! Provides:
//! - **Authenticators**: Supabase user lookup, local HS256 JWT verification,
//!   and a static token table for development
//! - **Audit logging**: Structured security event logging

pub mod audit;
pub mod auth;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use auth::{
    JwtAuthenticator, StaticTokenAuthenticator, SupabaseAuthenticator, build_from_config,
};
