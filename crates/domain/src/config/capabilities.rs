use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External capabilities
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Each capability is optional; an unconfigured one is replaced by a
/// stand-in that always reports itself unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub document_analysis: Option<EndpointConfig>,
    #[serde(default)]
    pub pdf_render: Option<EndpointConfig>,
    #[serde(default)]
    pub agent: Option<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    /// Environment variable holding a bearer key for the endpoint.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key_env: None,
            timeout_ms: d_timeout_ms(),
            max_retries: d_max_retries(),
        }
    }
}

fn d_timeout_ms() -> u64 {
    30_000
}
fn d_max_retries() -> u32 {
    2
}
