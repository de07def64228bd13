//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing process-wide telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter could not be parsed or a subscriber is already set.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The Prometheus recorder could not be built or installed.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("recorder already set".to_string());
        assert_eq!(
            err.to_string(),
            "failed to initialize metrics: recorder already set"
        );
        let err = TelemetryError::LoggingInit("bad directive".to_string());
        assert_eq!(err.to_string(), "failed to initialize logging: bad directive");
    }
}
