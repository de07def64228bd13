//! Session storage.
//!
//! A [`Store`] creates, persists and expires sessions. [`MemoryStore`] keeps
//! them in a concurrent map with a per-entry deadline that is pushed back on
//! every save or refresh, and sweeps out expired entries at most once per
//! lifetime as new sessions are written.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::session::Session;

/// Default session lifetime (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Backend holding sessions by id.
///
/// Implementations guard their own state; a store is shared by every
/// request through an `Arc`.
pub trait Store: Send + Sync {
    /// Looks up a live session.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] when the id is unknown or expired.
    fn get(&self, id: &str) -> Result<Arc<Session>, SessionError>;

    /// Persists `session` and restarts its lifetime.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn save(&self, session: &Arc<Session>) -> Result<(), SessionError>;

    /// Creates and persists an empty session under `id`.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn generate(&self, id: &str) -> Result<Arc<Session>, SessionError>;

    /// Deletes the session. Removing an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn remove(&self, id: &str) -> Result<(), SessionError>;

    /// Restarts the lifetime of a live session.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] when the id is unknown or expired.
    fn refresh(&self, id: &str) -> Result<(), SessionError>;
}

#[derive(Debug)]
struct Entry {
    session: Arc<Session>,
    expires_at: Instant,
}

/// In-process session store.
///
/// Expired entries are dropped when looked up, and in bulk by a sweep that
/// runs on the first write after each `ttl` interval has elapsed. Sessions
/// that are never looked up again are therefore reclaimed without an
/// external timer. [`purge_expired`](Self::purge_expired) runs a sweep on
/// demand.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trellis_session::{MemoryStore, Store};
///
/// let store = MemoryStore::new(Duration::from_secs(60));
/// let session = store.generate("abc").unwrap();
/// session.set("user", "ana").unwrap();
///
/// let again = store.get("abc").unwrap();
/// assert_eq!(again.get::<String>("user").unwrap(), "ana");
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    sessions: DashMap<String, Entry>,
    ttl: Duration,
    next_sweep: Mutex<Instant>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryStore {
    /// Creates a store whose sessions live for `ttl` after their last save
    /// or refresh.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            next_sweep: Mutex::new(Instant::now() + ttl),
        }
    }

    /// The configured session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` when the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, "expired sessions purged");
        }
        purged
    }

    /// Sweeps if the interval has elapsed. Concurrent writers skip the
    /// sweep another thread is already running.
    fn sweep_if_due(&self, now: Instant) {
        let Some(mut next) = self.next_sweep.try_lock() else {
            return;
        };
        if now < *next {
            return;
        }
        *next = now + self.ttl;
        drop(next);
        self.purge_expired();
    }

    fn insert(&self, session: Arc<Session>) {
        let now = Instant::now();
        self.sweep_if_due(now);
        let expires_at = now + self.ttl;
        self.sessions.insert(
            session.id().to_string(),
            Entry {
                session,
                expires_at,
            },
        );
    }

    fn not_found(id: &str) -> SessionError {
        SessionError::NotFound { id: id.to_string() }
    }
}

impl Store for MemoryStore {
    fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let now = Instant::now();
        let found = self.sessions.get(id).map(|entry| {
            (entry.expires_at > now).then(|| Arc::clone(&entry.session))
        });

        match found {
            Some(Some(session)) => Ok(session),
            Some(None) => {
                // the read guard is released, so removal cannot deadlock
                self.sessions
                    .remove_if(id, |_, entry| entry.expires_at <= now);
                Err(Self::not_found(id))
            }
            None => Err(Self::not_found(id)),
        }
    }

    fn save(&self, session: &Arc<Session>) -> Result<(), SessionError> {
        self.insert(Arc::clone(session));
        Ok(())
    }

    fn generate(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let session = Arc::new(Session::new(id));
        self.insert(Arc::clone(&session));
        tracing::debug!(session_id = id, "session created");
        Ok(session)
    }

    fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }

    fn refresh(&self, id: &str) -> Result<(), SessionError> {
        let now = Instant::now();
        match self.sessions.get_mut(id) {
            Some(mut entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                Ok(())
            }
            _ => Err(Self::not_found(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_then_get_shares_session() {
        let store = MemoryStore::default();
        let created = store.generate("a").unwrap();
        created.set("k", &1).unwrap();

        let fetched = store.get("a").unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
        assert_eq!(store.ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_unknown_id() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.get("nope").unwrap_err(),
            SessionError::NotFound { ref id } if id == "nope"
        ));
        assert!(store.refresh("nope").is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = MemoryStore::default();
        store.generate("a").unwrap();
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.get("a").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_is_gone() {
        let store = MemoryStore::new(Duration::ZERO);
        store.generate("a").unwrap();
        assert_eq!(store.len(), 1);

        assert!(store.get("a").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_refresh_extends_lifetime() {
        let store = MemoryStore::new(Duration::from_millis(200));
        store.generate("a").unwrap();

        std::thread::sleep(Duration::from_millis(120));
        store.refresh("a").unwrap();
        std::thread::sleep(Duration::from_millis(120));

        assert!(store.get("a").is_ok());
    }

    #[test]
    fn test_expired_session_cannot_be_refreshed() {
        let store = MemoryStore::new(Duration::ZERO);
        store.generate("a").unwrap();
        assert!(matches!(
            store.refresh("a").unwrap_err(),
            SessionError::NotFound { .. }
        ));
    }

    #[test]
    fn test_save_reinserts_removed_session() {
        let store = MemoryStore::default();
        let session = store.generate("a").unwrap();
        store.remove("a").unwrap();

        store.save(&session).unwrap();
        assert!(store.get("a").is_ok());
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStore::new(Duration::from_millis(20));
        store.generate("a").unwrap();
        store.generate("b").unwrap();
        assert_eq!(store.purge_expired(), 0);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.purge_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_abandoned_sessions_are_reclaimed_by_later_writes() {
        let store = MemoryStore::new(Duration::from_millis(1));
        for i in 0..5_000 {
            store.generate(&format!("old-{i}")).unwrap();
        }

        std::thread::sleep(Duration::from_millis(20));
        for i in 0..5_000 {
            store.generate(&format!("new-{i}")).unwrap();
        }

        // the first write after the pause swept every abandoned entry
        assert!(store.len() <= 5_000);
        assert!(store.get("old-0").is_err());
    }

    #[test]
    fn test_live_sessions_survive_sweeps() {
        let store = MemoryStore::new(Duration::from_millis(30));
        store.generate("stale").unwrap();
        std::thread::sleep(Duration::from_millis(40));

        store.generate("fresh").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").is_ok());
    }
}
