//! # Trellis
//!
//! **Trie-routed HTTP dispatch with middleware chains**
//!
//! Trellis resolves each request against a per-method segment trie, then
//! drives the matched handler list through a [`Context`](core::Context):
//!
//! - **Routing**: literal, `:param` and `*` segments; literal beats
//!   parameter beats wildcard at every level
//! - **Chains**: group middleware runs before route handlers, each calling
//!   `next()` to descend or `abort()` to stop
//! - **Buffered responses**: handlers write status, headers and body into
//!   the context; the server flushes them once
//! - **Batteries**: access log, fault recovery, latency metrics, tracing
//!   spans and cookie sessions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trellis::http::StatusCode;
//! use trellis::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new();
//!     engine.use_middleware([
//!         RecoveryBuilder::new().build(),
//!         LoggerBuilder::new().build(),
//!     ]);
//!     engine.get(
//!         "/hello/:name",
//!         [handler(|ctx: &mut Context| {
//!             let name = ctx.param("name").unwrap_or("world").to_string();
//!             ctx.string(StatusCode::OK, format!("hello {name}"))
//!         })],
//!     );
//!
//!     engine.start("127.0.0.1:8080").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Engine::dispatch → Router::find_route ─┬→ Context::next → ... → handler
//!                                                  └→ not-found handler (404)
//! Response ← Context::into_response ←──────────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/trellis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use trellis_core as core;
pub use trellis_middleware as middleware;
pub use trellis_router as router;
pub use trellis_server as server;
pub use trellis_session as session;
pub use trellis_telemetry as telemetry;

pub use http;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use trellis::prelude::*;
///
/// let mut engine = Engine::new();
/// engine.get("/ping", [handler(|ctx: &mut Context| {
///     ctx.string(trellis::http::StatusCode::OK, "pong")
/// })]);
/// ```
pub mod prelude {
    pub use trellis_core::{handler, Context, Fault, Handler, HandlerResult, Params, RequestId};

    pub use trellis_router::{RouteError, Router};

    pub use trellis_server::{
        Engine, EngineBuilder, EngineConfig, RouterGroup, ServerError, ShutdownSignal,
    };

    pub use trellis_middleware::{
        LoggerBuilder, MetricsBuilder, MiddlewareBuilder, RecoveryBuilder, TracingBuilder,
    };

    pub use trellis_session::{need_session, CookiePropagator, Manager, MemoryStore, Session};

    pub use trellis_telemetry::{init_telemetry, prometheus_handler, TelemetryConfig};
}
