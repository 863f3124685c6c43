//! Per-session turn serialization.
//!
//! Two turns for the same `(team, session)` never overlap inside one
//! process: the second waits for the first. Different sessions run in
//! parallel. This does not coordinate across processes; the store's
//! revision check covers that when `optimistic_concurrency` is on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each context key maps to a `Semaphore(1)`. Holding the permit gives
/// exclusive access for one turn; it releases on drop.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
    wait_limit: Duration,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl SessionLockMap {
    pub fn new(wait_limit: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait_limit,
        }
    }

    /// Wait for the session's lock, up to the configured limit.
    pub async fn acquire(&self, key: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        if let Ok(permit) = sem.clone().try_acquire_owned() {
            return Ok(permit);
        }
        tracing::debug!(key, "turn in progress for session, waiting");

        match tokio::time::timeout(self.wait_limit, sem.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            _ => Err(SessionBusy),
        }
    }

    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks nobody holds or waits on.
    pub fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
        before - locks.len()
    }
}

/// The session's current turn did not finish within the wait limit.
#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy: another turn is still in progress")
    }
}

impl std::error::Error for SessionBusy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn different_sessions_run_concurrently() {
        let map = SessionLockMap::default();
        let _a = map.acquire("team:s1").await.unwrap();
        let _b = map.acquire("team:s2").await.unwrap();
        assert_eq!(map.session_count(), 2);
    }

    #[tokio::test]
    async fn same_session_waits_for_release() {
        let map = Arc::new(SessionLockMap::default());
        let first = map.acquire("team:s1").await.unwrap();

        let waiter = {
            let map = map.clone();
            tokio::spawn(async move {
                let _permit = map.acquire("team:s1").await.unwrap();
                7
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        assert_eq!(waiter.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn gives_up_after_wait_limit() {
        let map = SessionLockMap::new(Duration::from_millis(20));
        let _held = map.acquire("team:s1").await.unwrap();
        assert!(map.acquire("team:s1").await.is_err());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let map = SessionLockMap::default();
        let held = map.acquire("team:busy").await.unwrap();
        drop(map.acquire("team:idle").await.unwrap());
        assert_eq!(map.prune_idle(), 1);
        assert_eq!(map.session_count(), 1);
        drop(held);
        assert_eq!(map.prune_idle(), 1);
    }
}
