use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Root directory for the file backend; contexts live under
    /// `<state_path>/contexts/`.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Rolling expiry applied on every save.
    #[serde(default = "d_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "d_flush")]
    pub flush_interval_secs: u64,
    /// Save with compare-and-swap on the revision read at turn start.
    #[serde(default)]
    pub optimistic_concurrency: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            state_path: d_state_path(),
            ttl_secs: d_ttl(),
            flush_interval_secs: d_flush(),
            optimistic_concurrency: false,
        }
    }
}

fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
fn d_ttl() -> u64 {
    3600
}
fn d_flush() -> u64 {
    30
}
