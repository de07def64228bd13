//! # Trellis Server
//!
//! The engine that ties routing and the request context together, plus the
//! HTTP/1.1 listener that serves it.
//!
//! - [`Engine`]: route registration through a default group, nested
//!   [`RouterGroup`]s, a not-found handler and [`Engine::dispatch`]
//! - [`Engine::start`] / [`Engine::start_with_shutdown`]: Tokio + Hyper
//!   listener with a body size limit and graceful shutdown
//! - [`EngineConfig`]: layered configuration (defaults, TOML, environment)
//!
//! ## Example
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use trellis_core::{handler, Context};
//! use trellis_server::{Engine, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trellis_server::ServerError> {
//!     let mut engine = Engine::builder()
//!         .on_bound(|listener| println!("listening on {:?}", listener.local_addr()))
//!         .build();
//!
//!     engine.get("/hello/:name", [handler(|ctx: &mut Context| {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         ctx.string(StatusCode::OK, format!("hello {name}"))
//!     })]);
//!
//!     engine
//!         .start_with_shutdown("127.0.0.1:8080", ShutdownSignal::with_os_signals())
//!         .await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod engine;
mod error;
mod group;
mod server;
pub mod shutdown;

pub use config::{
    EngineConfig, EngineConfigBuilder, DEFAULT_MAX_BODY_BYTES, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
    ENV_PREFIX,
};
pub use engine::{BoundCallback, Engine, EngineBuilder, NOT_FOUND_BODY};
pub use error::{ConfigError, ServerError};
pub use group::RouterGroup;
pub use server::ResponseBody;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
