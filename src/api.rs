//! HTTP surface of the gateway
//!
//! A single axum `Router` exposing one endpoint per logical operation. Every
//! reply is a JSON envelope `{"status": "success"|"error"|"redirect", ...}`;
//! errors carry a fixed operation-specific `message` plus best-effort
//! upstream detail under `api_error`, so a caller always has something to
//! display.
//!
//! ## Endpoint Map
//!
//! | Route                 | Method | Description                          |
//! |-----------------------|--------|--------------------------------------|
//! | `/health`             | GET    | Liveness probe                       |
//! | `/submit_manifest`    | POST   | Create a manifest document           |
//! | `/proceed_to_actions` | POST   | Redirect envelope to the actions view|
//! | `/review_hts`         | POST   | Verify an HTS code                   |
//! | `/manifest_actions`   | GET    | Session's master bill number         |
//! | `/delete_manifest`    | POST   | Delete the session's manifest        |
//! | `/view_manifest`      | POST   | Retrieve the session's manifest      |
//! | `/send_manifest`      | POST   | File the session's manifest          |
//! | `/get_manifest`       | GET    | List all manifests                   |

use crate::config::ServerConfig;
use crate::error::Error;
use crate::gateway::Gateway;
use crate::manifest::{ManifestForm, ReviewHtsRequest};
use crate::session::{session_middleware, SessionId};
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Extension, Form, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const SUBMIT_UNAVAILABLE_MESSAGE: &str =
    "Failed to connect to the documents API. The server may be down or unreachable.";
const SUBMIT_FAILED_MESSAGE: &str = "Failed to process the request due to a server error.";
const REVIEW_FAILED_MESSAGE: &str = "Failed to verify HTS code.";
const DELETE_FAILED_MESSAGE: &str = "Failed to delete the manifest.";
const VIEW_FAILED_MESSAGE: &str = "Failed to retrieve the manifest.";
const SEND_FAILED_MESSAGE: &str = "Failed to send the manifest.";
const GET_FAILED_MESSAGE: &str = "Failed to retrieve manifests.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// Build the complete Clearway HTTP application
pub fn build_app(gateway: Arc<Gateway>, server: &ServerConfig) -> Router {
    let cors = build_cors(&server.cors_origins);
    let cookie_name = server.session_cookie.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/submit_manifest", post(submit_manifest))
        .route("/proceed_to_actions", post(proceed_to_actions))
        .route("/review_hts", post(review_hts))
        .route("/manifest_actions", get(manifest_actions))
        .route("/delete_manifest", post(delete_manifest))
        .route("/view_manifest", post(view_manifest))
        .route("/send_manifest", post(send_manifest))
        .route("/get_manifest", get(get_manifest))
        .layer(middleware::from_fn(move |req, next| {
            session_middleware(cookie_name.clone(), req, next)
        }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { gateway })
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn submit_manifest(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Form(form): Form<ManifestForm>,
) -> impl IntoResponse {
    match state.gateway.submit_manifest(&session_id, &form).await {
        Ok(body) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "documents_response": body,
            })),
        ),
        Err(Error::Validation(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": message,
                "documents_response": null,
            })),
        ),
        Err(err @ Error::Unavailable { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": SUBMIT_UNAVAILABLE_MESSAGE,
                "api_error": api_error_detail(&err),
                "documents_response": null,
            })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "message": SUBMIT_FAILED_MESSAGE,
                "api_error": api_error_detail(&err),
                "documents_response": null,
            })),
        ),
    }
}

async fn proceed_to_actions() -> impl IntoResponse {
    Json(json!({
        "status": "redirect",
        "redirect_url": "/manifest_actions",
    }))
}

async fn review_hts(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(request): Json<ReviewHtsRequest>,
) -> impl IntoResponse {
    match state.gateway.review_hts(&session_id, &request).await {
        // A semantically invalid HTS code is still a completed verification:
        // HTTP 200 with an error-status envelope and the full upstream body.
        Ok(review) => (
            StatusCode::OK,
            Json(json!({
                "status": if review.valid { "success" } else { "error" },
                "message": review.message,
                "response": review.response,
            })),
        ),
        Err(Error::Validation(message)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": message,
            })),
        ),
        Err(err) => {
            let api_error = api_error_detail(&err);
            // Prefer the upstream's own message when it sent one
            let message = api_error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(REVIEW_FAILED_MESSAGE)
                .to_string();
            (
                failure_status(&err),
                Json(json!({
                    "status": "error",
                    "message": message,
                    "api_error": api_error,
                })),
            )
        }
    }
}

async fn manifest_actions(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> impl IntoResponse {
    let mbol_number = state
        .gateway
        .session_mbol(&session_id)
        .await
        .unwrap_or_else(|| "Unknown".to_string());

    Json(json!({
        "status": "success",
        "MBOLNumber": mbol_number,
    }))
}

async fn delete_manifest(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> impl IntoResponse {
    match state.gateway.delete_manifest(&session_id).await {
        Ok(body) => success_reply(body),
        Err(err) => failure_reply(DELETE_FAILED_MESSAGE, &err),
    }
}

async fn view_manifest(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> impl IntoResponse {
    match state.gateway.view_manifest(&session_id).await {
        Ok(body) => success_reply(body),
        Err(err) => failure_reply(VIEW_FAILED_MESSAGE, &err),
    }
}

async fn send_manifest(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> impl IntoResponse {
    match state.gateway.send_manifest(&session_id).await {
        Ok(body) => success_reply(body),
        Err(err) => failure_reply(SEND_FAILED_MESSAGE, &err),
    }
}

async fn get_manifest(State(state): State<AppState>) -> impl IntoResponse {
    match state.gateway.get_manifests().await {
        Ok(body) => success_reply(body),
        Err(err) => failure_reply(GET_FAILED_MESSAGE, &err),
    }
}

// =============================================================================
// Envelope helpers
// =============================================================================

fn success_reply(body: Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "response": body,
        })),
    )
}

/// Uniform error envelope: fixed operation message plus best-effort upstream
/// detail, mapped to 400/503/500
fn failure_reply(operation_message: &str, err: &Error) -> (StatusCode, Json<Value>) {
    if let Error::Validation(message) = err {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": message,
            })),
        );
    }

    (
        failure_status(err),
        Json(json!({
            "status": "error",
            "message": operation_message,
            "api_error": api_error_detail(err),
        })),
    )
}

fn failure_status(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error_detail(err: &Error) -> Value {
    err.api_error()
        .unwrap_or_else(|| json!({ "detail": err.to_string() }))
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
