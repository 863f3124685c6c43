use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Environment variable holding the API bearer token. When the variable
    /// is set and non-empty, every route except `/v1/health` requires
    /// `Authorization: Bearer <token>`.
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
    /// Per-IP token-bucket rate limiting. Disabled when `None`.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Upper bound on in-flight HTTP requests.
    #[serde(default = "d_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            cors: CorsConfig::default(),
            api_token_env: d_api_token_env(),
            rate_limit: None,
            max_concurrent_requests: d_max_concurrent(),
        }
    }
}

/// `requests_per_second` is the replenishment rate; `burst_size` is the
/// bucket capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. `["*"]` is permissive. Defaults to
    /// localhost on any port.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_port() -> u16 {
    8787
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_api_token_env() -> String {
    "LI_API_TOKEN".into()
}
fn d_max_concurrent() -> usize {
    128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_all_defaults() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.port, 8787);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.api_token_env, "LI_API_TOKEN");
        assert_eq!(cfg.max_concurrent_requests, 128);
        assert!(cfg.rate_limit.is_none());
    }

    #[test]
    fn parses_rate_limit_table() {
        let toml_str = r#"
            port = 9000

            [rate_limit]
            requests_per_second = 50
            burst_size = 100
        "#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.port, 9000);
        let rl = cfg.rate_limit.expect("rate_limit should be Some");
        assert_eq!(rl.requests_per_second, 50);
        assert_eq!(rl.burst_size, 100);
    }
}
