//! JSON-file-backed context store.
//!
//! Keeps everything in a [`MemoryContextStore`] and snapshots it to
//! `<state_path>/contexts/contexts.json`. The gateway flushes on an
//! interval and once more at shutdown.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use li_domain::context::ConversationContext;
use li_domain::error::{Error, Result};

use crate::store::{ContextStore, MemoryContextStore, StoredContext};

pub struct FileContextStore {
    path: PathBuf,
    inner: MemoryContextStore,
}

impl FileContextStore {
    /// Load or create the snapshot. Expired entries are dropped on load; a
    /// corrupt snapshot is logged and replaced by an empty store.
    pub fn new(state_path: &Path, ttl_secs: u64) -> Result<Self> {
        let dir = state_path.join("contexts");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        let path = dir.join("contexts.json");
        let mut entries: HashMap<String, StoredContext> = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %path.display(), "unreadable context snapshot, starting empty");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        let now = Utc::now();
        entries.retain(|_, stored| !stored.is_expired(now));

        tracing::info!(
            contexts = entries.len(),
            path = %path.display(),
            "context store loaded"
        );

        Ok(Self {
            path,
            inner: MemoryContextStore::with_entries(ttl_secs, entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current snapshot to disk.
    pub fn flush_now(&self) -> Result<()> {
        let snapshot = self.inner.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Store(format!("serializing contexts: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(Error::Io)?;
        std::fs::rename(&tmp, &self.path).map_err(Error::Io)?;
        Ok(())
    }
}

#[async_trait]
impl ContextStore for FileContextStore {
    async fn load(&self, session_id: &str, team_id: &str) -> Result<ConversationContext> {
        self.inner.load(session_id, team_id).await
    }

    async fn get(&self, session_id: &str, team_id: &str) -> Result<Option<ConversationContext>> {
        self.inner.get(session_id, team_id).await
    }

    async fn save(&self, ctx: &mut ConversationContext) -> Result<bool> {
        self.inner.save(ctx).await
    }

    async fn compare_and_save(
        &self,
        ctx: &mut ConversationContext,
        expected_revision: u64,
    ) -> Result<bool> {
        self.inner.compare_and_save(ctx, expected_revision).await
    }

    async fn prune_expired(&self) -> Result<usize> {
        self.inner.prune_expired().await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_now()
    }
}
