use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::state::AppState;

use super::error_response;

/// `GET /v1/context/:team_id/:session_id`: the stored context, if any.
pub async fn get_context(
    State(state): State<AppState>,
    Path((team_id, session_id)): Path<(String, String)>,
) -> Response {
    match state.store.get(&session_id, &team_id).await {
        Ok(Some(ctx)) => Json(ctx).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no context for this session"),
        Err(e) => {
            tracing::error!(error = %e, "reading context failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
