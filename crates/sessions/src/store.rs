//! Context store interface and the in-memory TTL implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use li_domain::context::ConversationContext;
use li_domain::error::Result;
use li_domain::trace::TraceEvent;

use crate::key::context_key;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Load/save of conversation contexts with rolling expiry.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Stored context for the pair, or a fresh one when none is live.
    /// Refreshes `last_updated` either way. Does not persist.
    async fn load(&self, session_id: &str, team_id: &str) -> Result<ConversationContext>;

    /// Stored context without creating one.
    async fn get(&self, session_id: &str, team_id: &str) -> Result<Option<ConversationContext>>;

    /// Last-write-wins save. Bumps `revision`, refreshes the TTL.
    async fn save(&self, ctx: &mut ConversationContext) -> Result<bool>;

    /// Save only if the stored revision still equals `expected_revision`
    /// (0 when nothing is stored). Returns `false` on mismatch and leaves
    /// both the store and `ctx` untouched.
    async fn compare_and_save(
        &self,
        ctx: &mut ConversationContext,
        expected_revision: u64,
    ) -> Result<bool>;

    /// Drop expired entries; returns how many were removed.
    async fn prune_expired(&self) -> Result<usize>;

    /// Persist buffered state, if the backend buffers.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredContext {
    pub context: ConversationContext,
    pub expires_at: DateTime<Utc>,
}

impl StoredContext {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct MemoryContextStore {
    ttl: Duration,
    ttl_secs: u64,
    entries: RwLock<HashMap<String, StoredContext>>,
}

impl MemoryContextStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_entries(ttl_secs, HashMap::new())
    }

    pub(crate) fn with_entries(ttl_secs: u64, entries: HashMap<String, StoredContext>) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
        Self {
            ttl: Duration::seconds(secs),
            ttl_secs,
            entries: RwLock::new(entries),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub(crate) fn snapshot(&self) -> HashMap<String, StoredContext> {
        self.entries.read().clone()
    }

    fn live(&self, key: &str, now: DateTime<Utc>) -> Option<ConversationContext> {
        self.entries
            .read()
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.context.clone())
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Write under an already-held lock decision.
    fn write_entry(
        &self,
        entries: &mut HashMap<String, StoredContext>,
        key: String,
        ctx: &mut ConversationContext,
        now: DateTime<Utc>,
    ) {
        ctx.revision += 1;
        ctx.last_updated = now.timestamp_millis();
        entries.insert(
            key.clone(),
            StoredContext {
                context: ctx.clone(),
                expires_at: self.expiry_from(now),
            },
        );
        TraceEvent::ContextSaved {
            key,
            revision: ctx.revision,
            ttl_secs: self.ttl_secs,
        }
        .emit();
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn load(&self, session_id: &str, team_id: &str) -> Result<ConversationContext> {
        let key = context_key(session_id, team_id);
        let now = Utc::now();
        let (mut ctx, is_new) = match self.live(&key, now) {
            Some(ctx) => (ctx, false),
            None => (ConversationContext::new(session_id, team_id), true),
        };
        ctx.last_updated = now.timestamp_millis();

        TraceEvent::ContextLoaded {
            key,
            is_new,
            message_count: ctx.message_count,
        }
        .emit();

        Ok(ctx)
    }

    async fn get(&self, session_id: &str, team_id: &str) -> Result<Option<ConversationContext>> {
        Ok(self.live(&context_key(session_id, team_id), Utc::now()))
    }

    async fn save(&self, ctx: &mut ConversationContext) -> Result<bool> {
        let key = context_key(ctx.session_id(), ctx.team_id());
        let now = Utc::now();
        let mut entries = self.entries.write();
        // Revision continues from whatever is stored so concurrent writers
        // never reuse a number.
        let stored_rev = entries
            .get(&key)
            .filter(|s| !s.is_expired(now))
            .map(|s| s.context.revision)
            .unwrap_or(0);
        ctx.revision = ctx.revision.max(stored_rev);
        self.write_entry(&mut entries, key, ctx, now);
        Ok(true)
    }

    async fn compare_and_save(
        &self,
        ctx: &mut ConversationContext,
        expected_revision: u64,
    ) -> Result<bool> {
        let key = context_key(ctx.session_id(), ctx.team_id());
        let now = Utc::now();
        let mut entries = self.entries.write();
        let found = entries
            .get(&key)
            .filter(|s| !s.is_expired(now))
            .map(|s| s.context.revision)
            .unwrap_or(0);
        if found != expected_revision {
            tracing::warn!(
                key = %key,
                expected = expected_revision,
                found,
                "context revision conflict"
            );
            return Ok(false);
        }
        ctx.revision = found;
        self.write_entry(&mut entries, key, ctx, now);
        Ok(true)
    }

    async fn prune_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned expired contexts");
        }
        Ok(removed)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_creates_fresh_context_without_persisting() {
        let store = MemoryContextStore::new(3600);
        let ctx = store.load("s1", "acme").await.unwrap();
        assert_eq!(ctx.session_id(), "s1");
        assert_eq!(ctx.team_id(), "acme");
        assert_eq!(ctx.revision, 0);
        assert!(store.get("s1", "acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_bumps_revision_and_is_visible_to_load() {
        let store = MemoryContextStore::new(3600);
        let mut ctx = store.load("s1", "acme").await.unwrap();
        ctx.message_count = 3;
        assert!(store.save(&mut ctx).await.unwrap());
        assert_eq!(ctx.revision, 1);

        let again = store.load("s1", "acme").await.unwrap();
        assert_eq!(again.message_count, 3);
        assert_eq!(again.revision, 1);
    }

    #[tokio::test]
    async fn teams_do_not_share_contexts() {
        let store = MemoryContextStore::new(3600);
        let mut ctx = store.load("s1", "acme").await.unwrap();
        ctx.add_matter("Family Law");
        store.save(&mut ctx).await.unwrap();
        let other = store.load("s1", "globex").await.unwrap();
        assert!(other.established_matters().is_empty());
    }

    #[tokio::test]
    async fn compare_and_save_rejects_stale_revision() {
        let store = MemoryContextStore::new(3600);
        let mut first = store.load("s1", "acme").await.unwrap();
        let mut second = store.load("s1", "acme").await.unwrap();

        assert!(store.compare_and_save(&mut first, 0).await.unwrap());
        assert!(!store.compare_and_save(&mut second, 0).await.unwrap());
        assert_eq!(second.revision, 0);

        let mut reloaded = store.load("s1", "acme").await.unwrap();
        assert!(store.compare_and_save(&mut reloaded, 1).await.unwrap());
        assert_eq!(reloaded.revision, 2);
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let store = MemoryContextStore::new(0);
        let mut ctx = store.load("s1", "acme").await.unwrap();
        ctx.message_count = 5;
        store.save(&mut ctx).await.unwrap();
        assert!(store.get("s1", "acme").await.unwrap().is_none());
        assert_eq!(store.load("s1", "acme").await.unwrap().message_count, 0);
        assert_eq!(store.prune_expired().await.unwrap(), 1);
        assert!(store.is_empty());
    }
}
