//! `POST /v1/chat`: run one intake turn.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use li_domain::error::Error;
use li_domain::message::{Attachment, Message};

use crate::runtime::{run_turn, TurnError, TurnInput};
use crate::state::AppState;

use super::error_response;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Existing session. A new one is minted when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    pub team_id: String,
    /// Full conversation so far, newest last.
    pub messages: Vec<Message>,
    /// Files uploaded with this turn.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    let session_id = match body.session_id.filter(|s| !s.trim().is_empty()) {
        Some(id) => id,
        None => uuid::Uuid::new_v4().to_string(),
    };

    let input = TurnInput {
        session_id,
        team_id: body.team_id,
        messages: body.messages,
        attachments: body.attachments,
    };

    match run_turn(&state, input).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => turn_error_response(&e),
    }
}

pub(crate) fn turn_error_response(err: &TurnError) -> Response {
    let status = match err {
        TurnError::UnknownTeam(_) => StatusCode::NOT_FOUND,
        TurnError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
        TurnError::Store(Error::StoreConflict { .. }) => StatusCode::CONFLICT,
        TurnError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "turn failed");
    } else {
        tracing::debug!(error = %err, %status, "turn rejected");
    }
    error_response(status, err.to_string())
}
