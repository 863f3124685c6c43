use std::sync::Arc;

use li_capabilities::IntakeAgent;
use li_domain::config::{Config, TeamConfig};
use li_sessions::ContextStore;

use crate::pipeline::{Pipeline, PipelineEnv};
use crate::runtime::session_lock::SessionLockMap;

/// Shared application state passed to all API handlers and the CLI.
///
/// Fields are grouped by concern:
/// - **Core services**: config, context store
/// - **Pipeline**: ordered middleware, the environment they share, agent
/// - **Concurrency & security**: per-session locks, token hash
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub store: Arc<dyn ContextStore>,

    // ── Pipeline ──────────────────────────────────────────────────────
    pub pipeline: Arc<Pipeline>,
    pub env: Arc<PipelineEnv>,
    /// Intake agent for turns no middleware answered. `None` = hand the
    /// turn back with the `AI_HANDLE` sentinel.
    pub agent: Option<Arc<dyn IntakeAgent>>,

    // ── Concurrency & security ────────────────────────────────────────
    pub session_locks: Arc<SessionLockMap>,
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}

impl AppState {
    pub fn team(&self, team_id: &str) -> Option<&TeamConfig> {
        self.config.teams.get(team_id)
    }
}
