//! # Trellis Core
//!
//! Request context, handler chain and fault types for the Trellis server
//! framework.
//!
//! This crate provides the types every handler and middleware works with:
//!
//! - [`Context`] - Per-request state: request, path parameters, scratch
//!   store, chain cursor and buffered response
//! - [`Handler`] - Cloneable, type-erased `Fn(&mut Context) -> HandlerResult`
//! - [`Fault`] - Per-request failure propagated back through the chain
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/trellis-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;

pub use context::{Context, RequestId, REQUEST_ID_HEADER};
pub use error::{BoxError, Fault};
pub use handler::{handler, Handler, HandlerResult};
pub use trellis_router::Params;
