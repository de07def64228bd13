//! Fault-barrier middleware.
//!
//! Wraps the downstream chain and converts a propagated [`Fault`] into a
//! response. The fault is reported to a sink (a `tracing` error event by
//! default), optionally together with a captured backtrace, and then the
//! recovery handler writes the response (500 `Internal Server Error` by
//! default).
//!
//! Faults are ordinary `Err` values, so the barrier is a plain match on the
//! result of `next()`. Panics are not caught.

use std::backtrace::Backtrace;
use std::error::Error as _;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use http::StatusCode;
use trellis_core::{Context, Fault, Handler, HandlerResult};

use crate::MiddlewareBuilder;

/// Receives the diagnostic for every recovered fault.
pub type FaultSink = Arc<dyn Fn(&str) + Send + Sync>;

fn tracing_sink(diagnostic: &str) {
    tracing::error!(target: "trellis::recovery", "{diagnostic}");
}

fn internal_server_error(ctx: &mut Context) -> HandlerResult {
    ctx.string(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Renders a fault and its source chain, one cause per line.
fn describe(fault: &Fault, with_backtrace: bool) -> String {
    let mut out = fault.to_string();
    let mut source = fault.source();
    while let Some(cause) = source {
        let _ = write!(out, "\n  caused by: {cause}");
        source = cause.source();
    }
    if with_backtrace {
        let _ = write!(out, "\nTraceback:\n{}", Backtrace::force_capture());
    }
    out
}

/// Builds the fault-barrier middleware.
///
/// Register it first so it encloses every other handler.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use trellis_core::{handler, Context};
/// use trellis_middleware::{MiddlewareBuilder, RecoveryBuilder};
///
/// let recovery = RecoveryBuilder::new()
///     .log_backtrace(true)
///     .handler(handler(|ctx: &mut Context| {
///         ctx.json(StatusCode::INTERNAL_SERVER_ERROR, &serde_json::json!({"error": "internal"}))
///     }))
///     .build();
/// ```
#[derive(Clone, Default)]
pub struct RecoveryBuilder {
    sink: Option<FaultSink>,
    log_backtrace: bool,
    handler: Option<Handler>,
}

impl RecoveryBuilder {
    /// Creates a builder with the tracing sink and the default 500 handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sink receiving fault diagnostics.
    #[must_use]
    pub fn sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Appends a captured backtrace to each diagnostic.
    #[must_use]
    pub fn log_backtrace(mut self, enabled: bool) -> Self {
        self.log_backtrace = enabled;
        self
    }

    /// Replaces the handler that writes the recovery response.
    #[must_use]
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl fmt::Debug for RecoveryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryBuilder")
            .field("custom_sink", &self.sink.is_some())
            .field("log_backtrace", &self.log_backtrace)
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}

impl MiddlewareBuilder for RecoveryBuilder {
    fn build(&self) -> Handler {
        let sink: FaultSink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(tracing_sink),
        };
        let recover = self
            .handler
            .clone()
            .unwrap_or_else(|| Handler::new(internal_server_error));
        let log_backtrace = self.log_backtrace;

        Handler::new(move |ctx: &mut Context| {
            let Err(fault) = ctx.next() else {
                return Ok(());
            };
            sink(&describe(&fault, log_backtrace));
            // the faulting frame left the cursor mid-chain
            ctx.abort();
            recover.call(ctx)
        })
    }
}
