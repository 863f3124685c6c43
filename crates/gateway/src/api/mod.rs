pub mod auth;
pub mod chat;
pub mod context;
pub mod health;
pub mod tools;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the `LI_API_TOKEN` bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health::health));

    let protected = Router::new()
        // Turns
        .route("/v1/chat", post(chat::chat))
        // Tools for externally run agents
        .route("/v1/tools", get(tools::list_tools))
        .route("/v1/tools/dispatch", post(tools::dispatch_tool))
        // Context introspection
        .route("/v1/context/:team_id/:session_id", get(context::get_context))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public.merge(protected)
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}
