use serde::{Deserialize, Serialize};

use li_domain::case::CaseDraft;
use li_domain::message::{Message, ToolCall, ToolDefinition};

// ── Document analysis ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub file_id: String,
    /// `contract`, `medical_document`, `government_form`, `resume`,
    /// `image`, `legal_document` or `general`.
    pub analysis_type: String,
    pub question: String,
}

// ── PDF rendering ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub team_name: String,
    pub brand_color: String,
    #[serde(default)]
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub case_draft: CaseDraft,
    #[serde(default)]
    pub client_name: Option<String>,
    pub brand: Brand,
}

#[derive(Debug, Clone, Default)]
pub struct RenderOutcome {
    pub success: bool,
    pub pdf: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl RenderOutcome {
    pub fn rendered(pdf: Vec<u8>) -> Self {
        Self { success: true, pdf: Some(pdf), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, pdf: None, error: Some(error.into()) }
    }
}

// ── Agent ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub session_id: String,
    pub team_id: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    /// Snapshot of the conversation context the agent may read.
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}
