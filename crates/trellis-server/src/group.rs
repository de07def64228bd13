//! Route groups.
//!
//! A [`RouterGroup`] registers routes under a shared path prefix with a
//! shared middleware prefix. Nested groups copy their parent's prefix when
//! created, so middleware added to a parent later never reaches them.
//!
//! ```rust
//! use http::StatusCode;
//! use trellis_core::{handler, Context};
//! use trellis_server::Engine;
//!
//! let mut engine = Engine::new();
//! let mut api = engine.group("/api");
//! api.use_middleware([handler(|ctx: &mut Context| ctx.next())]);
//! api.get("/users/:id", [handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "user"))]);
//!
//! assert_eq!(engine.routes()[0].1, "/api/users/:id");
//! ```

use http::Method;
use trellis_core::Handler;
use trellis_router::{RouteError, Router};

/// Base path and middleware inherited by routes registered through a group.
#[derive(Debug, Clone)]
pub(crate) struct GroupPrefix {
    base_path: String,
    handlers: Vec<Handler>,
}

impl Default for GroupPrefix {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
            handlers: Vec::new(),
        }
    }
}

impl GroupPrefix {
    pub(crate) fn base_path(&self) -> &str {
        &self.base_path
    }

    pub(crate) fn nested(&self, relative_path: &str) -> Self {
        Self {
            base_path: join_paths(&self.base_path, relative_path),
            handlers: self.handlers.clone(),
        }
    }

    pub(crate) fn extend(&mut self, middleware: impl IntoIterator<Item = Handler>) {
        self.handlers.extend(middleware);
    }

    pub(crate) fn register(
        &self,
        router: &mut Router<Handler>,
        method: Method,
        path: &str,
        handlers: Vec<Handler>,
    ) -> Result<(), RouteError> {
        let pattern = join_paths(&self.base_path, path);
        if handlers.is_empty() {
            return Err(RouteError::EmptyHandlers { pattern });
        }

        let mut chain = Vec::with_capacity(self.handlers.len() + handlers.len());
        chain.extend(self.handlers.iter().cloned());
        chain.extend(handlers);

        tracing::debug!(%method, %pattern, handlers = chain.len(), "route registered");
        router.add_route(method, &pattern, chain)
    }
}

/// Joins `relative` onto `base`, resolving `.` and `..` and collapsing
/// repeated slashes. The result is always absolute and has no trailing slash
/// except for the root itself.
pub(crate) fn join_paths(base: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::with_capacity(base.len() + relative.len() + 1);
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Registers routes under a common path and middleware prefix.
///
/// Obtained from [`Engine::group`](crate::Engine::group) or
/// [`RouterGroup::group`]. Registration methods panic on invalid routes,
/// which surfaces mistakes at startup; [`try_handle`](Self::try_handle)
/// returns the error instead.
#[derive(Debug)]
pub struct RouterGroup<'e> {
    router: &'e mut Router<Handler>,
    prefix: GroupPrefix,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(router: &'e mut Router<Handler>, prefix: GroupPrefix) -> Self {
        Self { router, prefix }
    }

    /// The absolute path every route in this group starts with.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.prefix.base_path()
    }

    /// Creates a nested group below `relative_path`.
    ///
    /// The child starts with a copy of this group's middleware.
    pub fn group(&mut self, relative_path: &str) -> RouterGroup<'_> {
        RouterGroup {
            prefix: self.prefix.nested(relative_path),
            router: &mut *self.router,
        }
    }

    /// Appends middleware for routes registered through this group from now on.
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.prefix.extend(middleware);
        self
    }

    /// Registers `handlers` for `method` at `path` relative to this group.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::EmptyHandlers`] when `handlers` is empty, or
    /// the router's error when the route conflicts with an existing one.
    pub fn try_handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<&mut Self, RouteError> {
        self.prefix
            .register(self.router, method, path, handlers.into_iter().collect())?;
        Ok(self)
    }

    /// Registers `handlers` for `method` at `path` relative to this group.
    ///
    /// # Panics
    ///
    /// Panics when `handlers` is empty or the route conflicts with an
    /// existing one.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> &mut Self {
        if let Err(err) = self
            .prefix
            .register(self.router, method, path, handlers.into_iter().collect())
        {
            panic!("{err}");
        }
        self
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.handle(Method::GET, path, handlers)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.handle(Method::POST, path, handlers)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.handle(Method::PUT, path, handlers)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.handle(Method::DELETE, path, handlers)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.handle(Method::PATCH, path, handlers)
    }

    /// Registers an `OPTIONS` route.
    pub fn options(
        &mut self,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> &mut Self {
        self.handle(Method::OPTIONS, path, handlers)
    }

    /// Registers a `HEAD` route.
    pub fn head(&mut self, path: &str, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.handle(Method::HEAD, path, handlers)
    }
}
