//! Record store implementations for Digm.
//!
//! All backends implement `digm_core::RecordStore` and are read-only.

pub mod in_memory;
pub mod rest;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use rest::SupabaseStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use digm_config::AppConfig;
use digm_core::error::StoreError;
use digm_core::store::RecordStore;
use std::sync::Arc;
use std::time::Duration;

/// Build the record store selected by `config.store.backend`.
pub async fn build_from_config(config: &AppConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    let timeout = Duration::from_secs(config.store.timeout_secs);

    match config.store.backend.as_str() {
        "supabase" => {
            let url = config.store.supabase_url.as_deref().ok_or_else(|| {
                StoreError::NotConfigured("SUPABASE_URL is not set".into())
            })?;
            let key = config.store.supabase_anon_key.as_deref().ok_or_else(|| {
                StoreError::NotConfigured("SUPABASE_ANON_KEY is not set".into())
            })?;
            Ok(Arc::new(SupabaseStore::new(url, key).with_timeout(timeout)))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.store.database_url.as_deref().ok_or_else(|| {
                StoreError::NotConfigured("DATABASE_URL is not set".into())
            })?;
            Ok(Arc::new(PostgresStore::connect(url).await?))
        }
        #[cfg(not(feature = "postgres"))]
        "postgres" => Err(StoreError::NotConfigured(
            "built without the `postgres` feature".into(),
        )),
        "memory" => {
            tracing::warn!("Using the in-memory record store; every user starts empty");
            Ok(Arc::new(InMemoryStore::new()))
        }
        other => Err(StoreError::NotConfigured(format!("unknown store backend '{other}'"))),
    }
}
