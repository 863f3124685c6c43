//! Turn runtime: the caller of the middleware pipeline.
//!
//! Entry point: [`run_turn`] loads the session's context, runs the
//! pipeline, falls back to the intake agent (and its tool calls) when no
//! stage answered, and saves the context.

pub mod session_lock;
mod turn;

pub use turn::run_turn;

use serde::{Deserialize, Serialize};

use li_domain::context::ConversationContext;
use li_domain::message::{Attachment, Message};

use crate::tools::ToolResponse;

use self::session_lock::SessionBusy;

/// Fallback when the agent errors or times out.
pub const AGENT_FALLBACK: &str = "I'm sorry, I'm having trouble responding right now. \
Could you try sending your message again in a moment?";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn input / output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
pub struct TurnInput {
    pub session_id: String,
    pub team_id: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnReply {
    /// A middleware stage answered the turn.
    Middleware { text: String },
    /// The intake agent answered the turn.
    Agent { text: String },
    /// Nobody answered; the caller runs its own agent.
    AiHandle { sentinel: String },
}

impl TurnReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Middleware { text } | Self::Agent { text } => text,
            Self::AiHandle { sentinel } => sentinel,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResultRecord {
    pub call_id: String,
    pub tool_name: String,
    pub response: ToolResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutput {
    pub session_id: String,
    pub reply: TurnReply,
    pub middleware_used: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultRecord>,
    pub context: ConversationContext,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error(transparent)]
    Busy(#[from] SessionBusy),

    #[error(transparent)]
    Store(#[from] li_domain::error::Error),
}
