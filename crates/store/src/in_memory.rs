//! In-memory record store — useful for testing and local development.
//!
//! Supports failure injection per table, an artificial latency, and a
//! query counter so callers can assert on store traffic.

use async_trait::async_trait;
use digm_core::error::StoreError;
use digm_core::record::display_value;
use digm_core::store::{RecordFilter, RecordStore, Row, Table};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// A record store holding rows in memory, keyed by table.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Arc<RwLock<HashMap<Table, Vec<Row>>>>,
    failing: Arc<RwLock<HashSet<Table>>>,
    latency: Option<Duration>,
    queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every query by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append a row to `table`.
    pub async fn insert(&self, table: Table, row: Row) {
        self.rows.write().await.entry(table).or_default().push(row);
    }

    /// Make every query against `table` fail.
    pub async fn fail_table(&self, table: Table) {
        self.failing.write().await.insert(table);
    }

    /// Total number of queries served (including failed ones).
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, table: Table, filter: &RecordFilter) -> Result<Vec<Row>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.read().await.contains(&table) {
            return Err(StoreError::Request(format!("injected failure on {table}")));
        }

        let rows = self.rows.read().await;
        Ok(rows
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        row.get(&filter.column)
                            .is_some_and(|v| display_value(v) == filter.value)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
