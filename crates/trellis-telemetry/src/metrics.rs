//! Prometheus metrics bootstrap.
//!
//! [`init_metrics`] installs a `metrics-exporter-prometheus` recorder as the
//! process-wide `metrics` backend, so the histograms recorded by the
//! `MetricsBuilder` middleware become visible. The rendered exposition is
//! served from a regular route through [`prometheus_handler`].
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_telemetry::{init_metrics, prometheus_handler, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default()).expect("metrics");
//! let scrape = prometheus_handler();
//! // engine.get("/metrics", [scrape]);
//! # let _ = scrape;
//! ```

use std::sync::OnceLock;

use http::StatusCode;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use trellis_core::{Context, Handler};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether a recorder is installed at all.
    pub enabled: bool,

    /// Histogram buckets, in the unit each histogram records. Empty means
    /// histograms are exported as summaries.
    pub buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // request latency in milliseconds: 1ms .. 10s
            buckets: vec![
                1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0,
                10_000.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder described by `config`.
///
/// A disabled config is a no-op.
///
/// # Errors
///
/// [`TelemetryError::MetricsInit`] when the buckets are rejected or another
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let mut builder = PrometheusBuilder::new();
    if !config.buckets.is_empty() {
        builder = builder
            .set_buckets(&config.buckets)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    let handle = builder
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    if METRICS_HANDLE.set(handle).is_err() {
        return Err(TelemetryError::MetricsInit(
            "metrics already initialized".to_string(),
        ));
    }
    tracing::debug!(buckets = config.buckets.len(), "prometheus recorder installed");
    Ok(())
}

/// Renders every recorded metric in Prometheus text format.
///
/// Returns `None` until [`init_metrics`] has succeeded.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Route handler serving [`render_metrics`].
///
/// Answers 503 while no recorder is installed.
#[must_use]
pub fn prometheus_handler() -> Handler {
    Handler::new(|ctx: &mut Context| match render_metrics() {
        Some(body) => ctx.data(StatusCode::OK, PROMETHEUS_CONTENT_TYPE, body),
        None => ctx.string(StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized"),
    })
}
