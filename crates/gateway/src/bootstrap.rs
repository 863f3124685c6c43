//! AppState construction and background-task spawning.
//!
//! Shared by `serve`, `run` and `chat` so every entry point boots the same
//! pipeline, store and capabilities.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use li_capabilities::{create_agent, create_document_analyzer, create_pdf_renderer};
use li_domain::config::{Config, ConfigSeverity, StoreBackend};
use li_domain::rules::RuleTable;
use li_sessions::{ContextStore, FileContextStore, MemoryContextStore};

use crate::pipeline::{Pipeline, PipelineEnv};
use crate::runtime::session_lock::SessionLockMap;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    // ── Rule table ───────────────────────────────────────────────────
    let rules = Arc::new(RuleTable::compile(&config.rules).context("compiling rule table")?);
    tracing::info!(?rules, "rule table compiled");

    // ── Context store ────────────────────────────────────────────────
    let store: Arc<dyn ContextStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryContextStore::new(config.store.ttl_secs)),
        StoreBackend::File => Arc::new(
            FileContextStore::new(&config.store.state_path, config.store.ttl_secs)
                .context("opening file context store")?,
        ),
    };
    tracing::info!(
        backend = ?config.store.backend,
        ttl_secs = config.store.ttl_secs,
        optimistic_concurrency = config.store.optimistic_concurrency,
        "context store ready"
    );

    // ── Capabilities ─────────────────────────────────────────────────
    let caps = &config.capabilities;
    let analyzer = create_document_analyzer(caps.document_analysis.as_ref())
        .context("creating document analysis client")?;
    let renderer =
        create_pdf_renderer(caps.pdf_render.as_ref()).context("creating pdf render client")?;
    let agent = create_agent(caps.agent.as_ref()).context("creating intake agent client")?;
    if agent.is_none() {
        tracing::info!("no intake agent configured; unanswered turns return AI_HANDLE");
    }

    // ── Pipeline ─────────────────────────────────────────────────────
    let pipeline = Arc::new(
        Pipeline::from_names(&config.pipeline.middleware).context("building middleware pipeline")?,
    );
    tracing::info!(stages = ?pipeline.stage_names(), "pipeline ready");

    let env = Arc::new(PipelineEnv {
        rules,
        analyzer,
        renderer,
        config: config.pipeline.clone(),
    });

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::info!(source = %format!("env:{env_var}"), "API bearer auth enabled");
                Some(Sha256::digest(token.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!(env_var = %env_var, "API token not set; API endpoints are unauthenticated");
                None
            }
        }
    };

    let session_locks = Arc::new(SessionLockMap::default());

    Ok(AppState {
        config,
        store,
        pipeline,
        env,
        agent,
        session_locks,
        api_token_hash,
    })
}

/// Spawn the long-running background tasks (store flush + expiry sweep,
/// session lock pruning).
///
/// Call this **after** [`build_app_state`] when running the HTTP server or
/// the interactive chat. One-shot `run` skips it.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic store flush + expiry sweep ──────────────────────────
    {
        let store = state.store.clone();
        let every = Duration::from_secs(state.config.store.flush_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match store.prune_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(removed = n, "expired contexts pruned"),
                    Err(e) => tracing::warn!(error = %e, "context expiry sweep failed"),
                }
                if let Err(e) = store.flush().await {
                    tracing::warn!(error = %e, "context store flush failed");
                }
            }
        });
    }

    // ── Periodic session lock pruning ────────────────────────────────
    {
        let session_locks = state.session_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let pruned = session_locks.prune_idle();
                if pruned > 0 {
                    tracing::debug!(pruned, "idle session locks pruned");
                }
            }
        });
    }
    tracing::info!("background tasks spawned");
}
