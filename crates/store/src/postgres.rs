//! PostgreSQL record store.
//!
//! Reads directly from the database behind a Supabase project (or any
//! Postgres with the same tables). Each row is returned as JSON via
//! `row_to_json`, so column sets need not be known ahead of time.
//!
//! # Feature gate
//!
//! This module is behind the `postgres` feature flag:
//!
//! ```toml
//! digm-store = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use digm_core::error::StoreError;
use digm_core::store::{RecordFilter, RecordStore, Row, Table};
use sqlx::Row as _;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

/// Record store backed by a PostgreSQL connection pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Request(format!("PostgreSQL connection failed: {e}")))?;

        info!("Connected to PostgreSQL record store");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the query for `table`. Table and column names come from a
    /// closed set, so interpolation is safe; the value is always bound.
    fn select_sql(table: Table, column: &str) -> Result<String, StoreError> {
        if column != table.owner_column() {
            return Err(StoreError::Request(format!(
                "unsupported filter column '{column}' on {table}"
            )));
        }
        Ok(format!(
            "SELECT row_to_json(t) AS row FROM {table} t WHERE t.{column}::text = $1"
        ))
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn query(&self, table: Table, filter: &RecordFilter) -> Result<Vec<Row>, StoreError> {
        let sql = Self::select_sql(table, &filter.column)?;
        debug!(table = %table, "Querying PostgreSQL");

        let rows = sqlx::query(&sql)
            .bind(&filter.value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let value: serde_json::Value = row
                    .try_get("row")
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                match value {
                    serde_json::Value::Object(map) => Ok(map),
                    other => Err(StoreError::Decode(format!("expected object, got {other}"))),
                }
            })
            .collect()
    }
}
