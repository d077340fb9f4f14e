//! Supabase (PostgREST) record store.
//!
//! Reads rows with `GET {url}/rest/v1/{table}?select=*&{column}=eq.{value}`,
//! authenticating with the project's anon key.

use async_trait::async_trait;
use digm_core::error::StoreError;
use digm_core::store::{RecordFilter, RecordStore, Row, Table};
use std::time::Duration;
use tracing::{debug, warn};

/// A record store backed by a Supabase project's REST interface.
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn query(&self, table: Table, filter: &RecordFilter) -> Result<Vec<Row>, StoreError> {
        debug!(table = %table, column = %filter.column, "Querying Supabase");

        let eq = format!("eq.{}", filter.value);
        let response = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*"), (filter.column.as_str(), eq.as_str())])
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout(e.to_string())
                } else {
                    StoreError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(table = %table, status = status.as_u16(), "Supabase query failed");
            return Err(StoreError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn query_filters_by_owner_column() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/goals"))
            .and(query_param("select", "*"))
            .and(query_param("user_id", "eq.u1"))
            .and(header("apikey", "anon"))
            .and(header("Authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "g1", "user_id": "u1", "title": "Run a marathon"},
                {"id": "g2", "user_id": "u1", "title": "Read 12 books"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(server.uri(), "anon");
        let rows = store
            .query(Table::Goals, &RecordFilter::owned_by(Table::Goals, "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Run a marathon");
    }

    #[tokio::test]
    async fn profiles_are_queried_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", "eq.u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "u1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(server.uri(), "anon");
        let rows = store
            .query(Table::Profiles, &RecordFilter::owned_by(Table::Profiles, "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/tasks"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(server.uri(), "anon");
        let err = store
            .query(Table::Tasks, &RecordFilter::owned_by(Table::Tasks, "u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status_code: 503, .. }));
    }

    #[tokio::test]
    async fn non_array_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/journal_entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"oops": true})))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(server.uri(), "anon");
        let err = store
            .query(
                Table::JournalEntries,
                &RecordFilter::owned_by(Table::JournalEntries, "u1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let store =
            SupabaseStore::new(server.uri(), "anon").with_timeout(Duration::from_millis(50));
        let err = store
            .query(Table::Goals, &RecordFilter::owned_by(Table::Goals, "u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let store = SupabaseStore::new("https://proj.supabase.co", "secret-anon");
        assert!(!format!("{store:?}").contains("secret-anon"));
    }
}
