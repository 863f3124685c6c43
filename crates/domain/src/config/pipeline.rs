use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Names accepted in `pipeline.middleware`, in default order.
pub const KNOWN_MIDDLEWARE: &[&str] = &[
    "content_policy",
    "contact_info",
    "jurisdiction",
    "case_draft",
    "file_analysis",
    "pdf_generation",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Execution order. Policy and jurisdiction checks belong before any
    /// stage that can create a matter. Contact capture runs ahead of the
    /// jurisdiction advisory so details given alongside an out-of-area
    /// location are still recorded.
    #[serde(default = "d_middleware")]
    pub middleware: Vec<String>,
    /// Messages longer than this many characters are spam.
    #[serde(default = "d_spam_max_chars")]
    pub spam_max_chars: usize,
    /// The repetition check only runs once `message_count` exceeds this.
    #[serde(default = "d_repetition_min_messages")]
    pub repetition_min_messages: u32,
    /// Unique-word ratio below which a message counts as repetitive.
    #[serde(default = "d_repetition_ratio")]
    pub repetition_max_unique_ratio: f64,
    /// Bound on every external capability call made during a turn.
    #[serde(default = "d_capability_timeout")]
    pub capability_timeout_secs: u64,
    #[serde(default = "d_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            middleware: d_middleware(),
            spam_max_chars: d_spam_max_chars(),
            repetition_min_messages: d_repetition_min_messages(),
            repetition_max_unique_ratio: d_repetition_ratio(),
            capability_timeout_secs: d_capability_timeout(),
            max_tool_rounds: d_max_tool_rounds(),
        }
    }
}

fn d_middleware() -> Vec<String> {
    KNOWN_MIDDLEWARE.iter().map(|s| (*s).to_owned()).collect()
}
fn d_spam_max_chars() -> usize {
    2000
}
fn d_repetition_min_messages() -> u32 {
    10
}
fn d_repetition_ratio() -> f64 {
    0.3
}
fn d_capability_timeout() -> u64 {
    30
}
fn d_max_tool_rounds() -> usize {
    5
}
