//! # Trellis Session
//!
//! Server-side sessions for Trellis handlers.
//!
//! - [`Session`]: JSON values keyed by name, with a modified flag
//! - [`Store`] / [`MemoryStore`]: where sessions live and expire
//! - [`Propagator`] / [`CookiePropagator`]: how the id travels with requests
//! - [`Manager`]: the lifecycle (init, get, save, refresh, remove)
//! - [`need_session`]: middleware guarding routes that require a session
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use http::StatusCode;
//! use trellis_core::{handler, Context};
//! use trellis_server::Engine;
//! use trellis_session::{need_session, Manager};
//!
//! let sessions = Manager::in_memory(Duration::from_secs(1800));
//! let mut engine = Engine::new();
//!
//! let login = sessions.clone();
//! engine.post("/login/:name", [handler(move |ctx: &mut Context| {
//!     let name = ctx.param("name").unwrap_or_default().to_string();
//!     let session = login.init_session(ctx)?;
//!     session.set("name", &name)?;
//!     login.save_session(ctx, &session)?;
//!     ctx.string(StatusCode::OK, "login success")
//! })]);
//!
//! let mut user = engine.group("/user");
//! user.use_middleware([need_session(sessions.clone(), None)]);
//! let greet = sessions.clone();
//! user.get("/hello", [handler(move |ctx: &mut Context| {
//!     let name: String = greet.get_session(ctx)?.get("name")?;
//!     ctx.string(StatusCode::OK, format!("hello {name}"))
//! })]);
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-session/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod manager;
mod middleware;
mod propagator;
mod session;
mod store;

pub use error::SessionError;
pub use manager::{Manager, DEFAULT_CTX_KEY};
pub use middleware::need_session;
pub use propagator::{CookiePropagator, Propagator, DEFAULT_COOKIE_NAME};
pub use session::Session;
pub use store::{MemoryStore, Store, DEFAULT_TTL};
