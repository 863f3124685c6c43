use serde::{Deserialize, Serialize};

/// A message in the intake conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Set on `Role::Tool` messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A file uploaded alongside the current turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    /// MIME type as reported by the uploader.
    #[serde(rename = "type", default)]
    pub mime_type: String,
    pub url: String,
}

/// Tool call emitted by the intake agent (provider-agnostic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Tool definition exposed to the intake agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: text.into(), tool_call_id: None }
    }
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: text.into(), tool_call_id: None }
    }
    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: text.into(), tool_call_id: None }
    }
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// The last message of the turn, whatever its role.
pub fn latest(messages: &[Message]) -> Option<&Message> {
    messages.last()
}

/// Text of the last message, only when the user sent it.
pub fn latest_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .last()
        .filter(|m| m.is_user())
        .map(|m| m.content.as_str())
}

/// Every user-authored message, oldest first.
pub fn user_texts(messages: &[Message]) -> impl Iterator<Item = &str> {
    messages.iter().filter(|m| m.is_user()).map(|m| m.content.as_str())
}
