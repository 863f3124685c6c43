//! Tool endpoints for callers that run their own agent.
//!
//! - `GET  /v1/tools`          : tool definitions to hand to the agent
//! - `POST /v1/tools/dispatch` : apply one tool call to a session's context

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::Value;

use li_domain::error::Error;
use li_sessions::context_key;

use crate::runtime::session_lock::SessionBusy;
use crate::state::AppState;
use crate::tools;

use super::error_response;

pub async fn list_tools() -> impl IntoResponse {
    Json(serde_json::json!({ "tools": tools::tool_definitions() }))
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub session_id: String,
    pub team_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

pub async fn dispatch_tool(
    State(state): State<AppState>,
    Json(body): Json<DispatchRequest>,
) -> Response {
    let Some(team) = state.team(&body.team_id).cloned() else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown team: {}", body.team_id));
    };

    let request = match tools::parse_tool_call(&body.tool_name, &body.arguments) {
        Ok(r) => r,
        Err(e @ Error::UnknownTool(_)) => return error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let key = context_key(&body.session_id, &body.team_id);
    let _permit = match state.session_locks.acquire(&key).await {
        Ok(p) => p,
        Err(SessionBusy) => {
            return error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "session is busy: a turn is already in progress",
            );
        }
    };

    let mut ctx = match state.store.load(&body.session_id, &body.team_id).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "loading context for tool dispatch failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let response = tools::dispatch(request, &mut ctx, &team, &state.env).await;

    if let Err(e) = state.store.save(&mut ctx).await {
        tracing::error!(error = %e, "saving context after tool dispatch failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    Json(serde_json::json!({
        "session_id": body.session_id,
        "tool_name": body.tool_name,
        "response": response,
        "revision": ctx.revision,
    }))
    .into_response()
}
