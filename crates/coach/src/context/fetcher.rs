//! Context fetcher — best-effort retrieval of everything known about a user.
//!
//! The five sources are queried concurrently. Each query is independent:
//! a failure or timeout in one yields an empty result for that slot and
//! never aborts the others. Results are merged by slot, not arrival order.

use digm_core::error::StoreError;
use digm_core::identity::UserIdentity;
use digm_core::record::{OnboardingAnswer, Profile, RecordItem, RecordKind, UserContext};
use digm_core::store::{RecordFilter, RecordStore, Row, Table};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::render::render_all;

/// Everything fetched for one request.
#[derive(Debug, Clone, Default)]
pub struct FetchedContext {
    pub user_context: UserContext,
    pub goals: Vec<RecordItem>,
    pub tasks: Vec<RecordItem>,
    pub journals: Vec<RecordItem>,
}

impl FetchedContext {
    /// Total number of goal, task, and journal records.
    pub fn record_count(&self) -> usize {
        self.goals.len() + self.tasks.len() + self.journals.len()
    }
}

/// Fetches a user's context from the record store.
pub struct ContextFetcher {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl ContextFetcher {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Fetch profile, onboarding answers, goals, tasks, and journal entries.
    pub async fn fetch(&self, user: &UserIdentity) -> FetchedContext {
        let (profile, onboarding, goals, tasks, journals) = tokio::join!(
            self.rows(Table::Profiles, user),
            self.rows(Table::OnboardingAnswers, user),
            self.rows(Table::Goals, user),
            self.rows(Table::Tasks, user),
            self.rows(Table::JournalEntries, user),
        );

        let profile = collapse(Table::Profiles, user, profile)
            .into_iter()
            .next()
            .map(Profile::from)
            .unwrap_or_default();
        let onboarding = collapse(Table::OnboardingAnswers, user, onboarding)
            .into_iter()
            .map(OnboardingAnswer::from)
            .collect();

        let fetched = FetchedContext {
            user_context: UserContext { profile, onboarding },
            goals: render_all(RecordKind::Goal, &collapse(Table::Goals, user, goals)),
            tasks: render_all(RecordKind::Task, &collapse(Table::Tasks, user, tasks)),
            journals: render_all(
                RecordKind::Journal,
                &collapse(Table::JournalEntries, user, journals),
            ),
        };

        debug!(
            user_id = %user,
            has_profile = !fetched.user_context.profile.is_empty(),
            onboarding = fetched.user_context.onboarding.len(),
            goals = fetched.goals.len(),
            tasks = fetched.tasks.len(),
            journals = fetched.journals.len(),
            "Context fetched"
        );

        fetched
    }

    /// Fetch only goals, tasks, and journal entries.
    pub async fn fetch_records(
        &self,
        user: &UserIdentity,
    ) -> (Vec<RecordItem>, Vec<RecordItem>, Vec<RecordItem>) {
        let (goals, tasks, journals) = tokio::join!(
            self.rows(Table::Goals, user),
            self.rows(Table::Tasks, user),
            self.rows(Table::JournalEntries, user),
        );
        (
            render_all(RecordKind::Goal, &collapse(Table::Goals, user, goals)),
            render_all(RecordKind::Task, &collapse(Table::Tasks, user, tasks)),
            render_all(
                RecordKind::Journal,
                &collapse(Table::JournalEntries, user, journals),
            ),
        )
    }

    /// One bounded query against `table` for rows owned by `user`.
    async fn rows(&self, table: Table, user: &UserIdentity) -> Result<Vec<Row>, StoreError> {
        let filter = RecordFilter::owned_by(table, user.as_str());
        match tokio::time::timeout(self.timeout, self.store.query(table, &filter)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(format!(
                "{table} query exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Collapse a failed source into its empty value. The failure is logged,
/// never propagated.
fn collapse<T: Default>(table: Table, user: &UserIdentity, result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| {
        warn!(
            table = %table,
            user_id = %user,
            error = %e,
            "Source unavailable, continuing without it"
        );
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use digm_store::InMemoryStore;
    use serde_json::{Value, json};

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert(Table::Profiles, row(json!({"id": "u1", "display_name": "Ada", "level": 3})))
            .await;
        store
            .insert(
                Table::OnboardingAnswers,
                row(json!({"user_id": "u1", "data": {"focus": "fitness"}})),
            )
            .await;
        store
            .insert(
                Table::Goals,
                row(json!({"user_id": "u1", "title": "Run a marathon", "progress": 40})),
            )
            .await;
        store
            .insert(
                Table::Tasks,
                row(json!({"user_id": "u1", "title": "Buy shoes", "status": "todo"})),
            )
            .await;
        store
            .insert(Table::JournalEntries, row(json!({"user_id": "u1", "content": "Ran 5k"})))
            .await;
        store
            .insert(Table::Goals, row(json!({"user_id": "u2", "title": "Not mine"})))
            .await;
        store
    }

    fn fetcher(store: InMemoryStore) -> (ContextFetcher, Arc<InMemoryStore>) {
        let store = Arc::new(store);
        (ContextFetcher::new(store.clone(), Duration::from_secs(5)), store)
    }

    #[tokio::test]
    async fn fetches_all_sources_for_user() {
        let (fetcher, store) = fetcher(seeded_store().await);
        let ctx = fetcher.fetch(&UserIdentity::new("u1")).await;

        assert_eq!(ctx.user_context.profile.display_name().as_deref(), Some("Ada"));
        assert_eq!(ctx.user_context.onboarding.len(), 1);
        assert_eq!(ctx.goals.len(), 1);
        assert_eq!(ctx.goals[0].content, "Run a marathon (Due: No due date, Progress: 40%)");
        assert_eq!(ctx.tasks.len(), 1);
        assert_eq!(ctx.journals[0].content, "Ran 5k");
        assert_eq!(store.query_count(), 5);
    }

    #[tokio::test]
    async fn missing_profile_is_empty_not_error() {
        let (fetcher, _) = fetcher(InMemoryStore::new());
        let ctx = fetcher.fetch(&UserIdentity::new("nobody")).await;
        assert!(ctx.user_context.profile.is_empty());
        assert!(ctx.user_context.onboarding.is_empty());
        assert_eq!(ctx.record_count(), 0);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_affect_others() {
        let store = seeded_store().await;
        store.fail_table(Table::Tasks).await;
        let (fetcher, _) = fetcher(store);

        let ctx = fetcher.fetch(&UserIdentity::new("u1")).await;
        assert!(ctx.tasks.is_empty());
        assert_eq!(ctx.goals.len(), 1);
        assert_eq!(ctx.journals.len(), 1);
        assert!(!ctx.user_context.profile.is_empty());
    }

    #[tokio::test]
    async fn every_source_failing_still_yields_context() {
        let store = seeded_store().await;
        for table in Table::ALL {
            store.fail_table(table).await;
        }
        let (fetcher, _) = fetcher(store);

        let ctx = fetcher.fetch(&UserIdentity::new("u1")).await;
        assert!(ctx.user_context.profile.is_empty());
        assert_eq!(ctx.record_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out_to_empty() {
        let store = seeded_store().await.with_latency(Duration::from_secs(60));
        let store = Arc::new(store);
        let fetcher = ContextFetcher::new(store, Duration::from_secs(1));

        let ctx = fetcher.fetch(&UserIdentity::new("u1")).await;
        assert_eq!(ctx.record_count(), 0);
        assert!(ctx.user_context.profile.is_empty());
    }

    #[tokio::test]
    async fn fetch_records_skips_profile_and_onboarding() {
        let (fetcher, store) = fetcher(seeded_store().await);
        let (goals, tasks, journals) = fetcher.fetch_records(&UserIdentity::new("u1")).await;
        assert_eq!((goals.len(), tasks.len(), journals.len()), (1, 1, 1));
        assert_eq!(store.query_count(), 3);
    }
}
