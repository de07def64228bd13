//! Per-request fault type.
//!
//! A [`Fault`] is what a handler returns when it cannot complete. Faults are
//! request-scoped: they travel back through the chain as ordinary `Err`
//! values and are turned into a response by a fault barrier, or end the
//! request abnormally when none is installed.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error carried as the source of a [`Fault`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failure raised while handling a request.
///
/// # Example
///
/// ```
/// use trellis_core::{Context, Fault, HandlerResult};
///
/// fn load_order(ctx: &mut Context) -> HandlerResult {
///     let id = ctx.param("id").ok_or_else(|| Fault::msg("missing order id"))?;
///     if id == "0" {
///         return Err(Fault::msg("order 0 is reserved"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Error)]
pub enum Fault {
    /// A response body could not be serialized.
    #[error("failed to encode response body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The request body or query string could not be deserialized.
    #[error("failed to decode request: {0}")]
    Decode(#[source] BoxError),

    /// A response header name or value was invalid.
    #[error("invalid response header: {0}")]
    Header(#[from] http::Error),

    /// Application-level failure raised by a handler.
    #[error("{message}")]
    Handler {
        /// Human-readable description.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl Fault {
    /// Creates a handler fault with only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a handler fault wrapping an underlying error.
    pub fn new<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Handler {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wraps a deserialization error.
    pub fn decode<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Decode(source.into())
    }
}
