//! HTTP API gateway for the Digm coach.
//!
//! Exposes the coach, embedding and search endpoints plus root and health
//! probes over a single [`CoachPipeline`] built at startup.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use digm_coach::CoachPipeline;
use digm_config::{AppConfig, GatewayConfig};
use digm_security::AuditLogger;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<CoachPipeline>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with all gateway routes.
///
/// Security layers applied:
/// - Bearer token authentication on every `/api` route (per handler)
/// - CORS from `gateway.cors_origins`
/// - Request body size limit
/// - In-memory rate limiting per peer address
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_per_minute,
        Duration::from_secs(60),
    ));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/coach/query", post(api::coach_query_handler))
        .route("/api/embeddings/generate", post(api::generate_embeddings_handler))
        .route("/api/search", post(api::search_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors_layer(&config.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Build the auth, store and language-model collaborators once and wire
/// them into a pipeline. Security events go to the tracing audit sink.
pub async fn build_pipeline(
    config: &AppConfig,
) -> Result<CoachPipeline, Box<dyn std::error::Error>> {
    let authenticator = digm_security::build_from_config(config)?;
    let store = digm_store::build_from_config(config).await?;
    let provider = digm_providers::build_from_config(config);
    let audit = Arc::new(AuditLogger::tracing());

    info!(
        authenticator = authenticator.name(),
        store = store.name(),
        provider = provider.name(),
        model = %config.provider.model,
        "Collaborators ready"
    );

    Ok(CoachPipeline::from_config(config, authenticator, store, provider, audit))
}

/// Start the gateway HTTP server.
///
/// Refuses to start while required settings are missing.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let issues = config.readiness_issues();
    if !issues.is_empty() {
        return Err(format!("configuration is not ready: {}", issues.join("; ")).into());
    }

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState {
        pipeline: Arc::new(build_pipeline(&config).await?),
    });
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// --- Rate Limiter ---

/// Upper bound on tracked clients; new clients are refused past it.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key (see [`client_key`]).
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
/// A limit of 0 disables it.
struct RateLimiter {
    max_requests: usize,
    max_clients: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            max_clients: MAX_TRACKED_CLIENTS,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if !clients.contains_key(client_key) && clients.len() >= self.max_clients {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
            if clients.len() >= self.max_clients {
                return false;
            }
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Rate-limit key for a request: the peer IP when the server knows it,
/// otherwise a SHA-256 digest of the Authorization header, otherwise
/// "anonymous". Raw credentials are never stored.
fn client_key(req: &axum::extract::Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }

    match req.headers().get(header::AUTHORIZATION) {
        Some(value) => format!("auth:{:x}", Sha256::digest(value.as_bytes())),
        None => "anonymous".to_string(),
    }
}

/// Rate limiting middleware. Runs before authentication so rejected
/// requests never reach the auth collaborator; returns 429 Too Many
/// Requests when exceeded. The root and health probes are exempt.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if matches!(req.uri().path(), "/" | "/health") {
        return Ok(next.run(req).await);
    }

    if !limiter.check(&client_key(&req)) {
        warn!(path = %req.uri().path(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Digm AI Coach API is running!",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
