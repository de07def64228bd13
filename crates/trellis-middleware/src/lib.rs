//! # Trellis Middleware
//!
//! Cross-cutting middleware for the Trellis framework.
//!
//! Every middleware here is produced by a builder implementing
//! [`MiddlewareBuilder`]. A builder holds configuration (sinks, names,
//! recovery handlers) and [`build`](MiddlewareBuilder::build)s an ordinary
//! [`Handler`] that is registered like any other element of a chain:
//!
//! ```text
//! Request → Recovery → Tracing → Metrics → Logger → ... → Endpoint
//!              │          │         │         │
//!   fault → 500      span close  histogram  access log
//! ```
//!
//! | Builder             | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | [`LoggerBuilder`]   | One access-log entry per request                 |
//! | [`RecoveryBuilder`] | Fault barrier converting a fault into a 500      |
//! | [`MetricsBuilder`]  | Latency histogram by pattern, method and status  |
//! | [`TracingBuilder`]  | Request span named after the matched route       |
//!
//! Nothing here installs process-wide state: sinks and metric names are
//! passed to the builder, with tracing-backed defaults.
//!
//! ## Example
//!
//! ```
//! use trellis_middleware::{LoggerBuilder, MiddlewareBuilder, RecoveryBuilder};
//!
//! let chain = vec![
//!     RecoveryBuilder::new().log_backtrace(true).build(),
//!     LoggerBuilder::new().build(),
//! ];
//! assert_eq!(chain.len(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod logger;
pub mod metrics;
pub mod recovery;
pub mod trace;

pub use logger::{AccessLog, LoggerBuilder};
pub use metrics::MetricsBuilder;
pub use recovery::RecoveryBuilder;
pub use trace::TracingBuilder;

use trellis_core::Handler;

/// Produces a middleware [`Handler`] from builder configuration.
///
/// Building is cheap and may be repeated; each call returns an independent
/// handler sharing the builder's configuration.
pub trait MiddlewareBuilder {
    /// Builds the middleware handler.
    fn build(&self) -> Handler;
}
