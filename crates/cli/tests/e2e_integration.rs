//! End-to-end integration tests for the Digm coach service.
//!
//! These tests drive the HTTP router the way a client would, through the
//! auth gate, the context fetch, relevance selection, prompt composition
//! and the model call.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use digm_coach::{CoachPipeline, FALLBACK_RESPONSE};
use digm_config::AppConfig;
use digm_core::error::ProviderError;
use digm_core::message::{Message, Role};
use digm_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use digm_core::store::{Row, Table};
use digm_gateway::{GatewayState, build_router};
use digm_security::{AuditLogger, AuditOutcome, StaticTokenAuthenticator};
use digm_store::InMemoryStore;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A provider that answers with a fixed text and records every request.
struct RecordingProvider {
    reply: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    fn text(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone().map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn row(v: Value) -> Row {
    v.as_object().cloned().unwrap()
}

fn app(
    config: &AppConfig,
    store: Arc<InMemoryStore>,
    provider: Arc<RecordingProvider>,
    audit: Arc<AuditLogger>,
) -> Router {
    let auth = StaticTokenAuthenticator::default().with_token("tok-ada", "ada");
    let pipeline = CoachPipeline::from_config(config, Arc::new(auth), store, provider, audit);
    build_router(
        Arc::new(GatewayState {
            pipeline: Arc::new(pipeline),
        }),
        &config.gateway,
    )
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn ada_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert(
            Table::Profiles,
            row(json!({
                "id": "ada",
                "display_name": "Ada",
                "vision": "Ship the analytical engine",
                "level": 3,
                "xp": 420
            })),
        )
        .await;
    store
        .insert(
            Table::OnboardingAnswers,
            row(json!({"user_id": "ada", "question": "focus", "answer": "career"})),
        )
        .await;
    store
        .insert(Table::Goals, row(json!({"user_id": "ada", "title": "Finish PMP"})))
        .await;
    store
        .insert(
            Table::Tasks,
            row(json!({
                "user_id": "ada",
                "title": "Book exam",
                "status": "todo",
                "priority": "high"
            })),
        )
        .await;
    store
        .insert(
            Table::JournalEntries,
            row(json!({"user_id": "ada", "content": "Studied two chapters", "mood": "focused"})),
        )
        .await;
    // Another user's data must never leak into Ada's context.
    store
        .insert(Table::Goals, row(json!({"user_id": "bob", "title": "Bob's secret goal"})))
        .await;
    store
}

// ── E2E: Coach query ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_coach_query_grounds_answer_in_own_data() {
    let provider = Arc::new(RecordingProvider::text("Book the exam this week."));
    let app = app(
        &AppConfig::default(),
        Arc::new(ada_store().await),
        provider.clone(),
        Arc::new(AuditLogger::new()),
    );

    let response = app
        .oneshot(post(
            "/api/coach/query",
            Some("tok-ada"),
            json!({
                "message": "how are you",
                "chat_history": [{"message": "hi", "response": "hello"}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["response"], "Book the exam this week.");
    assert_eq!(json["user_context"]["profile"]["display_name"], "Ada");
    assert_eq!(json["user_context"]["onboarding"][0]["answer"], "career");

    let items = json["relevant_data"].as_array().unwrap();
    let kinds: Vec<&str> = items.iter().map(|i| i["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["goal", "task", "journal"]);
    assert_eq!(items[0]["content"], "Finish PMP (Due: No due date, Progress: 0%)");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
    assert_eq!(messages[1].content, "hi");
    assert_eq!(messages[2].content, "hello");
    assert_eq!(messages[3].content, "how are you");

    let system = &messages[0].content;
    assert!(system.contains("Ada"));
    assert!(system.contains("Ship the analytical engine"));
    assert!(!system.contains("Bob's secret goal"));
}

#[tokio::test]
async fn e2e_missing_bearer_never_reaches_store_or_model() {
    let store = Arc::new(ada_store().await);
    let provider = Arc::new(RecordingProvider::text("unused"));
    let audit = Arc::new(AuditLogger::new());
    let app = app(&AppConfig::default(), store.clone(), provider.clone(), audit.clone());

    let response = app
        .oneshot(post("/api/coach/query", None, json!({"message": "hi"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Invalid authentication token"}));
    assert_eq!(store.query_count(), 0);
    assert!(provider.requests().is_empty());
    assert_eq!(audit.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
}

#[tokio::test]
async fn e2e_degrades_to_fallback_when_collaborators_fail() {
    let store = ada_store().await;
    store.fail_table(Table::Goals).await;
    store.fail_table(Table::Profiles).await;
    let provider = Arc::new(RecordingProvider::failing(ProviderError::Network("reset".into())));
    let app = app(
        &AppConfig::default(),
        Arc::new(store),
        provider,
        Arc::new(AuditLogger::new()),
    );

    let response = app
        .oneshot(post("/api/coach/query", Some("tok-ada"), json!({"message": "help"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["response"], FALLBACK_RESPONSE);
    assert_eq!(json["user_context"]["profile"], json!({}));
    // Goals failed; tasks and journals still arrive.
    let kinds: Vec<&str> = json["relevant_data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["task", "journal"]);
}

// ── E2E: Embeddings and search ───────────────────────────────────────────

#[tokio::test]
async fn e2e_embeddings_ownership_is_enforced() {
    let store = Arc::new(ada_store().await);
    let audit = Arc::new(AuditLogger::new());
    let app = app(
        &AppConfig::default(),
        store.clone(),
        Arc::new(RecordingProvider::text("unused")),
        audit.clone(),
    );

    let response = app
        .oneshot(post("/api/embeddings/generate", Some("tok-ada"), json!({"user_id": "bob"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.query_count(), 0);
    assert_eq!(audit.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
}

#[tokio::test]
async fn e2e_search_ranks_by_kind() {
    let app = app(
        &AppConfig::default(),
        Arc::new(ada_store().await),
        Arc::new(RecordingProvider::text("unused")),
        Arc::new(AuditLogger::new()),
    );

    let response = app
        .oneshot(post("/api/search", Some("tok-ada"), json!({"query": "EXAM"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["results"][0]["type"], "task");
    assert!((json["results"][0]["relevance_score"].as_f64().unwrap() - 0.7).abs() < 1e-6);
}

// ── E2E: Real HTTP collaborators against mock servers ────────────────────

#[tokio::test]
async fn e2e_supabase_and_openai_over_http() {
    let supabase = MockServer::start().await;
    let llm = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "u1", "first_name": "Grace"}])),
        )
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/goals"))
        .and(query_param("user_id", "eq.u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user_id": "u1", "title": "Finish PMP", "progress": 40}
        ])))
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/journal_entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/onboarding_answers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_string_contains("Finish PMP (Due: No due date, Progress: 40%)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4",
            "choices": [{"message": {"role": "assistant", "content": "You're 40% there."}}]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let mut config = AppConfig::default();
    config.api_key = Some("sk-test".into());
    config.provider.base_url = Some(llm.uri());
    config.store.supabase_url = Some(supabase.uri());
    config.store.supabase_anon_key = Some("anon".into());
    assert!(config.readiness_issues().is_empty());

    let pipeline = digm_gateway::build_pipeline(&config).await.unwrap();
    let app = build_router(
        Arc::new(GatewayState {
            pipeline: Arc::new(pipeline),
        }),
        &config.gateway,
    );

    let response = app
        .oneshot(post("/api/coach/query", Some("user-token"), json!({"message": "Where am I?"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["response"], "You're 40% there.");
    assert_eq!(json["user_context"]["profile"]["first_name"], "Grace");
    assert_eq!(json["relevant_data"].as_array().unwrap().len(), 1);
}

// ── E2E: Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_defaults_and_roundtrip() {
    let config = AppConfig::default();

    assert_eq!(config.provider.model, "gpt-4");
    assert_eq!(config.provider.max_tokens, 500);
    assert!((config.provider.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(config.selection.limit, 10);
    assert_eq!(config.gateway.port, 8000);
    assert!(config.validate().is_ok());

    let rendered = config.redacted_toml();
    let reparsed: AppConfig = toml_roundtrip(&rendered);
    assert_eq!(reparsed.provider.model, config.provider.model);
    assert_eq!(reparsed.gateway.port, config.gateway.port);
}

fn toml_roundtrip(rendered: &str) -> AppConfig {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, rendered).unwrap();
    AppConfig::load_from(&path).unwrap()
}
