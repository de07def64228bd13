//! Request latency metrics middleware.
//!
//! Records one histogram observation per request through the `metrics`
//! facade, so any installed recorder (Prometheus via `trellis-telemetry`,
//! or a test-local recorder) receives it.
//!
//! # Metric
//!
//! | Name | Type | Labels | Unit |
//! |------|------|--------|------|
//! | `{namespace}_{subsystem}_{name}` | Histogram | `pattern`, `method`, `status` | milliseconds |
//!
//! `pattern` is the registered route (`/user/:id`), or `unknown` when no
//! route matched, which keeps label cardinality bounded.

use std::time::Instant;

use ::metrics::{describe_histogram, histogram, Unit};
use trellis_core::{Context, Handler};

use crate::MiddlewareBuilder;

/// Label value used when no route matched.
pub const UNKNOWN_PATTERN: &str = "unknown";

/// Builds the latency-histogram middleware.
///
/// # Example
///
/// ```
/// use trellis_middleware::{MetricsBuilder, MiddlewareBuilder};
///
/// let metrics = MetricsBuilder::new("http_request_latency")
///     .namespace("shop")
///     .subsystem("api")
///     .help("Latency of HTTP requests")
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsBuilder {
    namespace: String,
    subsystem: String,
    name: String,
    help: String,
}

impl MetricsBuilder {
    /// Creates a builder for a metric called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the metric namespace prefix.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the metric subsystem prefix.
    #[must_use]
    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    /// Sets the metric description.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Returns the full metric name, joining non-empty parts with `_`.
    #[must_use]
    pub fn metric_name(&self) -> String {
        [&self.namespace, &self.subsystem, &self.name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl MiddlewareBuilder for MetricsBuilder {
    fn build(&self) -> Handler {
        let name = self.metric_name();
        if !self.help.is_empty() {
            describe_histogram!(name.clone(), Unit::Milliseconds, self.help.clone());
        }

        Handler::new(move |ctx: &mut Context| {
            let start = Instant::now();
            let result = ctx.next();

            let pattern = match ctx.matched_route() {
                "" => UNKNOWN_PATTERN.to_string(),
                route => route.to_string(),
            };
            histogram!(
                name.clone(),
                "pattern" => pattern,
                "method" => ctx.method().to_string(),
                "status" => ctx.response_status().as_u16().to_string()
            )
            .record(start.elapsed().as_secs_f64() * 1000.0);

            result
        })
    }
}
