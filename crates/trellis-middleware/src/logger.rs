//! Access-log middleware.
//!
//! Emits one [`AccessLog`] entry per request once the downstream chain has
//! finished, so the entry carries the final status and the full latency.
//!
//! # Log Fields
//!
//! - `request_id` - Request identifier (UUID v7)
//! - `host` - `Host` header or URI authority
//! - `route` - Registered pattern that matched (`/user/:id`), empty if none
//! - `method` - HTTP method
//! - `path` - Concrete request path
//! - `status` - Final response status
//! - `latency_ms` - Time spent in the downstream chain

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use trellis_core::{Context, Handler};

use crate::MiddlewareBuilder;

/// Receives every access-log entry.
pub type AccessLogSink = Arc<dyn Fn(&AccessLog) + Send + Sync>;

/// One access-log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessLog {
    /// The request id.
    pub request_id: String,
    /// The request host.
    pub host: String,
    /// The matched route pattern.
    pub route: String,
    /// The HTTP method.
    pub method: String,
    /// The request path.
    pub path: String,
    /// The final status code.
    pub status: u16,
    /// Downstream latency in milliseconds.
    pub latency_ms: f64,
}

impl AccessLog {
    /// Captures an entry from a context after its chain has run.
    #[must_use]
    pub fn from_context(ctx: &Context, latency: Duration) -> Self {
        Self {
            request_id: ctx.request_id().to_string(),
            host: ctx.host().to_string(),
            route: ctx.matched_route().to_string(),
            method: ctx.method().to_string(),
            path: ctx.path().to_string(),
            status: ctx.response_status().as_u16(),
            latency_ms: latency.as_secs_f64() * 1000.0,
        }
    }
}

/// Default sink: a structured `tracing` event on the `trellis::access` target.
fn tracing_sink(entry: &AccessLog) {
    tracing::info!(
        target: "trellis::access",
        request_id = %entry.request_id,
        host = %entry.host,
        route = %entry.route,
        method = %entry.method,
        path = %entry.path,
        status = entry.status,
        latency_ms = entry.latency_ms,
        "request completed"
    );
}

/// Builds the access-log middleware.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use trellis_middleware::{AccessLog, LoggerBuilder, MiddlewareBuilder};
///
/// // Default: structured tracing event
/// let logger = LoggerBuilder::new().build();
///
/// // Custom sink, e.g. JSON lines to stdout
/// let logger = LoggerBuilder::new()
///     .sink(|entry: &AccessLog| println!("{}", serde_json::to_string(entry).unwrap()))
///     .build();
/// ```
#[derive(Clone, Default)]
pub struct LoggerBuilder {
    sink: Option<AccessLogSink>,
}

impl LoggerBuilder {
    /// Creates a builder using the tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sink receiving access-log entries.
    #[must_use]
    pub fn sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&AccessLog) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("custom_sink", &self.sink.is_some())
            .finish()
    }
}

impl MiddlewareBuilder for LoggerBuilder {
    fn build(&self) -> Handler {
        let sink: AccessLogSink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(tracing_sink),
        };

        Handler::new(move |ctx: &mut Context| {
            let start = Instant::now();
            let result = ctx.next();
            // logged even when the chain faulted
            sink(&AccessLog::from_context(ctx, start.elapsed()));
            result
        })
    }
}
