//! The engine: route table, default group and dispatcher.
//!
//! Each request moves through three stages. **Matching** resolves the route
//! (or falls back to the not-found handler), **executing** drives the chain
//! with a single `next()` call, and **flush** turns the buffered response
//! into exactly one [`Response`].

use std::fmt;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use trellis_core::{Context, Fault, Handler, HandlerResult, Params};
use trellis_router::{RouteError, Router};

use crate::config::EngineConfig;
use crate::group::{GroupPrefix, RouterGroup};

/// Body written by the default not-found handler.
pub const NOT_FOUND_BODY: &str = "404 NOT FOUND";

/// Callback invoked once with the bound listener, before serving starts.
pub type BoundCallback = Box<dyn FnOnce(&TcpListener) + Send>;

fn default_not_found(ctx: &mut Context) -> HandlerResult {
    ctx.string(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Route table plus dispatcher.
///
/// Routes are registered through the engine's default group (the methods
/// below forward to it) or through nested [`RouterGroup`]s. Once built, the
/// engine is served with [`start`](Self::start) or driven directly with
/// [`dispatch`](Self::dispatch).
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use trellis_core::{handler, Context};
/// use trellis_server::Engine;
///
/// let mut engine = Engine::new();
/// engine.get("/user/:id", [handler(|ctx: &mut Context| {
///     let id = ctx.param("id").unwrap_or_default().to_string();
///     ctx.string(StatusCode::OK, id)
/// })]);
///
/// let request = Request::get("/user/42").body(Bytes::new()).unwrap();
/// let response = engine.dispatch(request).unwrap();
/// assert_eq!(response.body().as_ref(), b"42");
/// ```
pub struct Engine {
    router: Router<Handler>,
    root: GroupPrefix,
    not_found: Handler,
    // Mutex keeps the engine Sync without requiring a Sync callback
    on_bound: Mutex<Option<BoundCallback>>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Engine {
    /// Creates an engine with the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a builder for custom options.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying route table.
    #[must_use]
    pub const fn router(&self) -> &Router<Handler> {
        &self.router
    }

    /// Every registered `(method, pattern)` pair.
    #[must_use]
    pub fn routes(&self) -> Vec<(&Method, &str)> {
        self.router.routes()
    }

    pub(crate) fn take_on_bound(&self) -> Option<BoundCallback> {
        self.on_bound.lock().take()
    }

    // ------------------------------------------------------------------
    // Default group
    // ------------------------------------------------------------------

    /// Creates a group below `relative_path`, inheriting the engine's
    /// middleware registered so far.
    pub fn group(&mut self, relative_path: &str) -> RouterGroup<'_> {
        RouterGroup::new(&mut self.router, self.root.nested(relative_path))
    }

    /// Appends middleware for every route registered on the engine from now on.
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.root.extend(middleware);
        self
    }

    /// Registers `handlers` for `method` at `path`.
    ///
    /// # Errors
    ///
    /// Returns the [`RouteError`] describing why the route was rejected.
    pub fn try_handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = Handler>,
    ) -> Result<&mut Self, RouteError> {
        self.root
            .register(&mut self.router, method, path, handlers.into_iter().collect())?;
        Ok(self)
    }

    /// Registers `handlers` for `method` at `path`.
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
        if let Err(err) = self.try_handle(method, path, handlers) {
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

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Runs one request through matching, execution and flush.
    ///
    /// Unmatched requests run only the not-found handler; group middleware
    /// is part of a route's chain and does not apply to them.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] that escaped the chain when no fault barrier
    /// handled it. The caller must not send a response in that case.
    pub fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Fault> {
        let mut ctx = Context::new(request);
        let found = self.router.find_route(ctx.method(), ctx.path());

        match found {
            Some(found) => {
                let pattern = found.pattern();
                let handlers = found.handlers().to_vec();
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    method = %ctx.method(),
                    path = ctx.path(),
                    route = pattern,
                    "dispatching"
                );
                ctx.install_route(pattern, found.into_params(), handlers);
            }
            None => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    method = %ctx.method(),
                    path = ctx.path(),
                    "no route matched"
                );
                ctx.install_route(String::new(), Params::new(), vec![self.not_found.clone()]);
            }
        }

        ctx.next()?;
        Ok(ctx.into_response())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("routes", &self.router.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    not_found: Option<Handler>,
    on_bound: Option<BoundCallback>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Replaces the handler run when no route matches.
    #[must_use]
    pub fn not_found(mut self, handler: Handler) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Sets a callback receiving the listener right after it is bound.
    ///
    /// Useful to discover the port when binding to `:0`.
    #[must_use]
    pub fn on_bound<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&TcpListener) + Send + 'static,
    {
        self.on_bound = Some(Box::new(callback));
        self
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine with no routes.
    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            router: Router::new(),
            root: GroupPrefix::default(),
            not_found: self
                .not_found
                .unwrap_or_else(|| Handler::new(default_not_found)),
            on_bound: Mutex::new(self.on_bound),
            config: self.config,
        }
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("custom_not_found", &self.not_found.is_some())
            .field("on_bound", &self.on_bound.is_some())
            .field("config", &self.config)
            .finish()
    }
}
