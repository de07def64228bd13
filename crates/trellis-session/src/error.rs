//! Session errors.

use http::header::InvalidHeaderValue;
use thiserror::Error;
use trellis_core::Fault;

/// Errors raised by session stores, propagators and the manager.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The request carries no session id.
    #[error("request carries no session id")]
    MissingId,

    /// No live session exists for the id (never created, removed or expired).
    #[error("session '{id}' not found")]
    NotFound {
        /// The session id that was looked up.
        id: String,
    },

    /// The session has no value under the key.
    #[error("session key '{key}' not found")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// A value could not be converted to or from JSON.
    #[error("session value conversion failed: {0}")]
    Value(#[from] serde_json::Error),

    /// The session id cannot be carried in a header.
    #[error("session id is not a valid header value: {0}")]
    InvalidId(#[from] InvalidHeaderValue),

    /// Writing the response header failed.
    #[error("failed to write session header: {0}")]
    Response(#[from] Fault),
}

impl From<SessionError> for Fault {
    fn from(err: SessionError) -> Self {
        Self::new("session error", err)
    }
}
