//! Coach API — the authenticated endpoints.
//!
//! Endpoints:
//!
//! - `POST /api/coach/query`          — Answer a coaching question
//! - `POST /api/embeddings/generate`  — Embed the caller's own records
//! - `POST /api/search`               — Substring search over the caller's records
//!
//! Every handler takes an [`AuthenticatedUser`], so the bearer credential
//! is resolved before the body is read and before any store call.
//!
//! Pipeline work runs on its own task; a panic there becomes a generic 500
//! instead of a dropped connection.

use axum::{
    extract::{FromRequest, FromRequestParts, Request, State, rejection::JsonRejection},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use digm_coach::{CoachAnswer, EmbeddingOutcome, SearchResults, bearer_token};
use digm_core::error::Error;
use digm_core::identity::UserIdentity;
use digm_core::message::ChatTurn;

use crate::SharedState;

// ── Requests ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CoachQueryRequest {
    pub message: String,
    #[serde(default)]
    pub chat_history: Option<Vec<ChatTurn>>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// An error response: status plus a caller-safe message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid authentication token".into(),
        }
    }

    /// Map a pipeline error. `failure` is the generic message used for
    /// anything that is not an auth or ownership failure.
    pub fn from_error(err: Error, failure: &str) -> Self {
        match err {
            Error::Unauthenticated => Self::unauthenticated(),
            Error::Forbidden(message) => Self {
                status: StatusCode::FORBIDDEN,
                message,
            },
            other => {
                error!(error = %other, "{failure}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: failure.to_string(),
                }
            }
        }
    }

    /// A body that could not be read or deserialized. Keeps the
    /// rejection's status (400, 413, 415 or 422) and its description.
    pub fn from_rejection(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

// ── Body extractor ────────────────────────────────────────────────────────

/// `Json<T>` whose rejection is an [`ApiError`], so malformed bodies get
/// the same `{"error": ...}` shape as every other failure.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ApiError::from_rejection)?;
        Ok(Self(value))
    }
}

// ── Auth extractor ────────────────────────────────────────────────────────

/// The caller's identity, resolved from `Authorization: Bearer <token>`.
pub struct AuthenticatedUser(pub UserIdentity);

impl FromRequestParts<SharedState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

        state
            .pipeline
            .resolver()
            .resolve(bearer_token(header), parts.uri.path())
            .await
            .map(AuthenticatedUser)
            .map_err(|_| ApiError::unauthenticated())
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn coach_query_handler(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CoachQueryRequest>,
) -> Result<Json<CoachAnswer>, ApiError> {
    let history = payload.chat_history.unwrap_or_default();
    info!(
        user_id = %user,
        message_len = payload.message.len(),
        history_turns = history.len(),
        "Coach query received"
    );

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move { pipeline.answer(&user, &payload.message, &history).await })
        .await
        .map(Json)
        .map_err(|e| {
            ApiError::from_error(Error::Internal(e.to_string()), "Failed to process coach query")
        })
}

pub async fn generate_embeddings_handler(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<EmbeddingRequest>,
) -> Result<Json<EmbeddingOutcome>, ApiError> {
    state
        .pipeline
        .generate_embeddings(&user, &payload.user_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to generate embeddings"))
}

pub async fn search_handler(
    State(state): State<SharedState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<SearchRequest>,
) -> Result<Json<SearchResults>, ApiError> {
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move { pipeline.search(&user, &payload.query, payload.limit).await })
        .await
        .map(Json)
        .map_err(|e| {
            ApiError::from_error(Error::Internal(e.to_string()), "Failed to search user data")
        })
}
