//! # Trellis Telemetry
//!
//! Process-wide logging and metrics bootstrap for Trellis services.
//!
//! The middleware in `trellis-middleware` only talks to the `tracing` and
//! `metrics` facades. This crate installs the backends behind them:
//!
//! - **Logging**: a `tracing-subscriber` registry with an `EnvFilter`,
//!   writing JSON lines or pretty output ([`init_logging`]).
//! - **Metrics**: a Prometheus recorder ([`init_metrics`]) whose exposition
//!   is served by an ordinary route ([`prometheus_handler`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config: TelemetryConfig = toml::from_str(
//!     r#"
//!     [logging]
//!     level = "info,trellis_server=debug"
//!
//!     [metrics]
//!     buckets = [5.0, 50.0, 500.0]
//!     "#,
//! )
//! .unwrap();
//!
//! init_telemetry(&config).expect("telemetry");
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{
    init_metrics, prometheus_handler, render_metrics, MetricsConfig, PROMETHEUS_CONTENT_TYPE,
};

use serde::Deserialize;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for every telemetry subsystem.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initializes logging, then metrics.
///
/// Call once, early in `main`.
///
/// # Errors
///
/// The first subsystem failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::info!(
        log_format = ?config.logging.format,
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(())
}
