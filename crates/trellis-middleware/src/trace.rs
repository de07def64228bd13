//! Request span middleware.
//!
//! Opens a `tracing` span around the downstream chain. `tracing` span names
//! are static, so the span itself is always called `http.request`; the
//! matched route is carried in `otel.name`, which OpenTelemetry-aware
//! subscribers use as the span name, and in `http.route` for plain `fmt` or
//! JSON subscribers, which print the constant name followed by the fields.

use tracing::field::Empty;
use trellis_core::{Context, Handler};

use crate::MiddlewareBuilder;

/// Builds the request span middleware.
///
/// Span fields: `otel.name` and `http.route` (matched route, or the path
/// when unmatched), `http.method`, `http.host`, `http.url`, `request_id`, and
/// `http.status_code` recorded once the chain returns.
#[derive(Debug, Clone, Default)]
pub struct TracingBuilder {
    _private: (),
}

impl TracingBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MiddlewareBuilder for TracingBuilder {
    fn build(&self) -> Handler {
        Handler::new(|ctx: &mut Context| {
            let name = match ctx.matched_route() {
                "" => ctx.path(),
                route => route,
            };
            let span = tracing::info_span!(
                "http.request",
                otel.name = %name,
                http.route = %name,
                http.method = %ctx.method(),
                http.host = %ctx.host(),
                http.url = %ctx.uri(),
                request_id = %ctx.request_id(),
                http.status_code = Empty,
            );
            let _entered = span.enter();

            let result = ctx.next();
            span.record("http.status_code", ctx.response_status().as_u16());
            result
        })
    }
}
