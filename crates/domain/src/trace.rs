use serde::Serialize;

/// Structured trace events emitted across all LexIntake crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ContextLoaded {
        key: String,
        is_new: bool,
        message_count: u32,
    },
    ContextSaved {
        key: String,
        revision: u64,
        ttl_secs: u64,
    },
    MiddlewareCompleted {
        middleware: String,
        responded: bool,
        stopped: bool,
    },
    MiddlewareFailed {
        middleware: String,
        error: String,
    },
    PolicyViolation {
        session_id: String,
        flag: String,
    },
    JurisdictionAdvisory {
        session_id: String,
        location: String,
    },
    CapabilityCall {
        capability: String,
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    PipelineCompleted {
        session_id: String,
        middleware_used: Vec<String>,
        short_circuited: bool,
    },
    ToolDispatched {
        session_id: String,
        tool_name: String,
        success: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "li_event");
    }
}
