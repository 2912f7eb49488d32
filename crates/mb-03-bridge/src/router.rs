//! # HTTP Ingress
//!
//! Thin alternative front door onto the same dispatcher the queues use.
//! The route decides the request kind; reply metadata is read from the
//! body's `props` object and the reply is also returned as the HTTP body.
//!
//! | Method | Path | Kind |
//! |--------|------|------|
//! | GET | `/health` | - |
//! | GET | `/users` | record snapshot |
//! | POST | `/users` | CREATE |
//! | PUT | `/users` | UPDATE |
//! | DELETE | `/users` | DELETE |
//! | POST | `/recommend` | RECOMMEND |
//! | POST | `/classify` | CLASSIFY |

use crate::dispatcher::{DispatchOutcome, RequestDispatcher};
use crate::domain::config::HttpConfig;
use crate::domain::envelope::{RequestEnvelope, RequestKind};
use crate::domain::status::StatusCode;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode as HttpStatus,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Body returned when `props` lacks a reply route.
pub const MISSING_PROPS_ERROR: &str = "Missing properties (reply_to or correlation_id)";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
}

pub fn build_router(state: AppState, config: &HttpConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/users",
            get(list_users)
                .post(create_user)
                .put(update_user)
                .delete(delete_user),
        )
        .route("/recommend", post(recommend))
        .route("/classify", post(classify))
        .layer(middleware)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn list_users(State(state): State<AppState>) -> Response {
    match state.dispatcher.list_records().await {
        Ok(records) => (HttpStatus::OK, Json(records)).into_response(),
        Err(e) => {
            let status = e.status();
            (
                http_status(status, None),
                Json(json!({ "statusCode": status, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn create_user(State(state): State<AppState>, body: Bytes) -> Response {
    handle(&state, RequestKind::Create, &body).await
}

async fn update_user(State(state): State<AppState>, body: Bytes) -> Response {
    handle(&state, RequestKind::Update, &body).await
}

async fn delete_user(State(state): State<AppState>, body: Bytes) -> Response {
    handle(&state, RequestKind::Delete, &body).await
}

async fn recommend(State(state): State<AppState>, body: Bytes) -> Response {
    handle(&state, RequestKind::Recommend, &body).await
}

async fn classify(State(state): State<AppState>, body: Bytes) -> Response {
    handle(&state, RequestKind::Classify, &body).await
}

async fn handle(state: &AppState, kind: RequestKind, body: &[u8]) -> Response {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Parse error: {e}")),
    };

    let envelope = match RequestEnvelope::from_http(kind, value) {
        Ok(envelope) => envelope,
        Err(e) => return bad_request(e.to_string()),
    };

    match state.dispatcher.dispatch(envelope).await {
        DispatchOutcome::Unroutable => {
            warn!(kind = %kind, "HTTP request without reply properties");
            (HttpStatus::BAD_REQUEST, Json(json!({ "error": MISSING_PROPS_ERROR }))).into_response()
        }
        DispatchOutcome::Replied { response, .. } => {
            (http_status(response.status_code, Some(kind)), Json(response)).into_response()
        }
    }
}

fn bad_request(message: String) -> Response {
    (
        HttpStatus::BAD_REQUEST,
        Json(json!({ "statusCode": StatusCode::InvalidInput, "error": message })),
    )
        .into_response()
}

fn http_status(status: StatusCode, kind: Option<RequestKind>) -> HttpStatus {
    HttpStatus::from_u16(status.http_status(kind)).unwrap_or(HttpStatus::INTERNAL_SERVER_ERROR)
}
