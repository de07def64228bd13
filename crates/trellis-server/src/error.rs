//! Server and configuration errors.

use std::path::PathBuf;

use thiserror::Error;
use trellis_core::Fault;

/// Errors raised while serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error on the bound listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request ended with a fault no barrier handled.
    #[error("request ended by unrecovered fault: {0}")]
    Fault(#[from] Fault),

    /// The blocking dispatch task panicked or was cancelled.
    #[error("dispatch task failed: {0}")]
    Dispatch(#[from] tokio::task::JoinError),
}

/// Errors raised while loading [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document was invalid.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("failed to parse environment variable {var}: {reason}")]
    Env {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: &'static str,
    },
}
