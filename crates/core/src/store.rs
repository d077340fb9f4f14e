//! RecordStore trait — read access to the externally owned datastore.
//!
//! The service only ever reads, and every read is a single equality
//! filter on one of a fixed set of tables.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A raw row as returned by the store.
pub type Row = Map<String, Value>;

/// Tables the pipeline reads from. A closed set, so backends can safely
/// interpolate the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    OnboardingAnswers,
    Goals,
    Tasks,
    JournalEntries,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Profiles,
        Table::OnboardingAnswers,
        Table::Goals,
        Table::Tasks,
        Table::JournalEntries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::OnboardingAnswers => "onboarding_answers",
            Self::Goals => "goals",
            Self::Tasks => "tasks",
            Self::JournalEntries => "journal_entries",
        }
    }

    /// The column holding the owning user's id. Profiles are keyed by
    /// their primary key; everything else by `user_id`.
    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::Profiles => "id",
            _ => "user_id",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equality filter: `column = value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub column: String,
    pub value: String,
}

impl RecordFilter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Filter selecting the rows of `table` owned by `user_id`.
    pub fn owned_by(table: Table, user_id: &str) -> Self {
        Self::equals(table.owner_column(), user_id)
    }
}

/// The record store collaborator.
///
/// Implementations: Supabase REST, PostgreSQL, in-memory (for testing).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The backend name (e.g., "supabase", "postgres", "in_memory").
    fn name(&self) -> &str;

    /// Return the rows of `table` matching `filter`, in the store's natural order.
    async fn query(
        &self,
        table: Table,
        filter: &RecordFilter,
    ) -> std::result::Result<Vec<Row>, StoreError>;
}
