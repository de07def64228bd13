//! Session lifecycle on top of a store and a propagator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use trellis_core::Context;
use uuid::Uuid;

use crate::error::SessionError;
use crate::propagator::{CookiePropagator, Propagator};
use crate::session::Session;
use crate::store::{MemoryStore, Store};

/// Default context key caching the request's session.
pub const DEFAULT_CTX_KEY: &str = "session-key";

/// Ties a [`Store`] and a [`Propagator`] to the request context.
///
/// The session resolved for a request is cached in the context under the
/// manager's key, so later lookups within the same request skip the store.
/// The manager is cheap to clone and is usually captured by handlers.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bytes::Bytes;
/// use http::Request;
/// use trellis_core::Context;
/// use trellis_session::Manager;
///
/// let manager = Manager::in_memory(Duration::from_secs(600));
/// let mut ctx = Context::new(Request::new(Bytes::new()));
///
/// let session = manager.init_session(&mut ctx).unwrap();
/// session.set("user", "ana").unwrap();
///
/// let same = manager.get_session(&mut ctx).unwrap();
/// assert_eq!(same.id(), session.id());
/// assert!(ctx.response_headers().contains_key("set-cookie"));
/// ```
#[derive(Clone)]
pub struct Manager {
    propagator: Arc<dyn Propagator>,
    store: Arc<dyn Store>,
    ctx_key: String,
}

impl Manager {
    /// Creates a manager from its parts, caching under [`DEFAULT_CTX_KEY`].
    pub fn new(propagator: impl Propagator + 'static, store: impl Store + 'static) -> Self {
        Self {
            propagator: Arc::new(propagator),
            store: Arc::new(store),
            ctx_key: DEFAULT_CTX_KEY.to_string(),
        }
    }

    /// Cookie propagation with an in-memory store of the given lifetime.
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(CookiePropagator::new(), MemoryStore::new(ttl))
    }

    /// Uses `key` to cache the session in the request context.
    #[must_use]
    pub fn ctx_key(mut self, key: impl Into<String>) -> Self {
        self.ctx_key = key.into();
        self
    }

    /// The store backing this manager.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Generates a fresh, time-ordered session id.
    #[must_use]
    pub fn new_session_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Returns the request's session.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingId`] when the request carries no id, or
    /// [`SessionError::NotFound`] when the id has no live session.
    pub fn get_session(&self, ctx: &mut Context) -> Result<Arc<Session>, SessionError> {
        if let Some(session) = ctx.get::<Arc<Session>>(&self.ctx_key) {
            return Ok(Arc::clone(session));
        }

        let id = self.propagator.extract(ctx)?;
        let session = self.store.get(&id)?;
        ctx.set(self.ctx_key.clone(), Arc::clone(&session));
        Ok(session)
    }

    /// Starts a new session with a generated id.
    ///
    /// See [`init_session_with_id`](Self::init_session_with_id).
    ///
    /// # Errors
    ///
    /// Store or propagation failures.
    pub fn init_session(&self, ctx: &mut Context) -> Result<Arc<Session>, SessionError> {
        self.init_session_with_id(ctx, &Self::new_session_id())
    }

    /// Starts a new session under `id`.
    ///
    /// A session the request already pointed to is dropped from the store.
    /// The new id is injected into the response.
    ///
    /// # Errors
    ///
    /// Store or propagation failures.
    pub fn init_session_with_id(
        &self,
        ctx: &mut Context,
        id: &str,
    ) -> Result<Arc<Session>, SessionError> {
        if let Ok(previous) = self.propagator.extract(ctx) {
            if let Err(err) = self.store.remove(&previous) {
                tracing::warn!(
                    session_id = %previous,
                    error = %err,
                    "failed to drop previous session"
                );
            }
        }

        let session = self.store.generate(id)?;
        ctx.set(self.ctx_key.clone(), Arc::clone(&session));
        self.propagator.inject(session.id(), ctx)?;
        Ok(session)
    }

    /// Deletes the request's session and tells the client to forget it.
    ///
    /// # Errors
    ///
    /// Lookup, store or propagation failures.
    pub fn remove_session(&self, ctx: &mut Context) -> Result<(), SessionError> {
        let session = self.get_session(ctx)?;
        self.store.remove(session.id())?;
        ctx.remove::<Arc<Session>>(&self.ctx_key);
        self.propagator.clean(ctx)
    }

    /// Restarts the lifetime of the request's session.
    ///
    /// # Errors
    ///
    /// Lookup or store failures.
    pub fn refresh_session(&self, ctx: &mut Context) -> Result<(), SessionError> {
        let session = self.get_session(ctx)?;
        self.store.refresh(session.id())
    }

    /// Persists `session` and makes it the request's session.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn save_session(
        &self,
        ctx: &mut Context,
        session: &Arc<Session>,
    ) -> Result<(), SessionError> {
        self.store.save(session)?;
        session.mark_saved();
        ctx.set(self.ctx_key.clone(), Arc::clone(session));
        Ok(())
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("ctx_key", &self.ctx_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{COOKIE, SET_COOKIE};
    use http::Request;

    fn manager() -> Manager {
        Manager::in_memory(Duration::from_secs(60))
    }

    fn request_with_session(id: &str) -> Context {
        Context::new(
            Request::builder()
                .uri("/")
                .header(COOKIE, format!("session_id={id}"))
                .body(Bytes::new())
                .unwrap(),
        )
    }

    #[test]
    fn test_new_session_id_is_uuid_v7() {
        let id = Manager::new_session_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
        assert_ne!(id, Manager::new_session_id());
    }

    #[test]
    fn test_get_session_without_cookie() {
        let mut ctx = Context::new(Request::new(Bytes::new()));
        assert!(matches!(
            manager().get_session(&mut ctx).unwrap_err(),
            SessionError::MissingId
        ));
    }

    #[test]
    fn test_get_session_unknown_id() {
        let mut ctx = request_with_session("ghost");
        assert!(matches!(
            manager().get_session(&mut ctx).unwrap_err(),
            SessionError::NotFound { .. }
        ));
    }

    #[test]
    fn test_get_session_from_cookie_is_cached() {
        let manager = manager();
        manager.store().generate("known").unwrap();

        let mut ctx = request_with_session("known");
        let first = manager.get_session(&mut ctx).unwrap();
        assert!(ctx.contains_key(DEFAULT_CTX_KEY));

        // later store changes do not affect the cached session
        manager.store().remove("known").unwrap();
        let second = manager.get_session(&mut ctx).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_init_session_replaces_previous() {
        let manager = manager();
        manager.store().generate("old").unwrap();

        let mut ctx = request_with_session("old");
        let session = manager.init_session_with_id(&mut ctx, "new").unwrap();

        assert_eq!(session.id(), "new");
        assert!(manager.store().get("old").is_err());
        assert!(manager.store().get("new").is_ok());
        assert_eq!(
            ctx.response_headers()[SET_COOKIE],
            "session_id=new; Path=/"
        );
    }

    #[test]
    fn test_remove_session_cleans_cookie() {
        let manager = manager();
        manager.store().generate("s1").unwrap();

        let mut ctx = request_with_session("s1");
        manager.remove_session(&mut ctx).unwrap();

        assert!(manager.store().get("s1").is_err());
        assert!(!ctx.contains_key(DEFAULT_CTX_KEY));
        assert_eq!(
            ctx.response_headers()[SET_COOKIE],
            "session_id=; Path=/; Max-Age=0"
        );
    }

    #[test]
    fn test_refresh_session() {
        let manager = manager();
        manager.store().generate("s1").unwrap();
        manager.refresh_session(&mut request_with_session("s1")).unwrap();

        let mut missing = Context::new(Request::new(Bytes::new()));
        assert!(manager.refresh_session(&mut missing).is_err());
    }

    #[test]
    fn test_save_session_clears_modified_flag() {
        let manager = manager();
        let mut ctx = Context::new(Request::new(Bytes::new()));
        let session = manager.init_session(&mut ctx).unwrap();
        session.set("k", "v").unwrap();
        assert!(session.is_modified());

        manager.save_session(&mut ctx, &session).unwrap();
        assert!(!session.is_modified());
        assert_eq!(
            manager
                .store()
                .get(session.id())
                .unwrap()
                .get::<String>("k")
                .unwrap(),
            "v"
        );
    }

    #[test]
    fn test_custom_ctx_key() {
        let manager = manager().ctx_key("my-session");
        let mut ctx = Context::new(Request::new(Bytes::new()));
        manager.init_session(&mut ctx).unwrap();
        assert!(ctx.contains_key("my-session"));
        assert!(!ctx.contains_key(DEFAULT_CTX_KEY));
    }
}
