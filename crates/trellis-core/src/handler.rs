//! Type-erased handlers.
//!
//! Every element of a handler chain, whether middleware or terminal
//! endpoint, is a [`Handler`]: a shared closure over `&mut Context`.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Fault;

/// Result returned by every handler.
///
/// `Err` stops forward progress through the chain and travels back up
/// through each enclosing `next()` call until a fault barrier handles it.
pub type HandlerResult = Result<(), Fault>;

type HandlerFn = dyn Fn(&mut Context) -> HandlerResult + Send + Sync;

/// A cloneable, type-erased request handler.
///
/// Cloning is cheap (reference count bump). Two handlers compare equal only
/// when they share the same underlying callable.
///
/// # Example
///
/// ```
/// use trellis_core::{handler, Context, Handler};
/// use http::StatusCode;
///
/// let hello = handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "hello"));
/// let same = hello.clone();
/// assert_eq!(hello, same);
///
/// let other = handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "hello"));
/// assert_ne!(hello, other);
/// ```
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Wraps a closure as a handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the handler against `ctx`.
    pub fn call(&self, ctx: &mut Context) -> HandlerResult {
        (self.0)(ctx)
    }

    /// Returns true if both handlers wrap the same callable.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Shorthand for [`Handler::new`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    Handler::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request, StatusCode};

    #[test]
    fn test_handler_call() {
        let h = handler(|ctx: &mut Context| {
            ctx.status(StatusCode::ACCEPTED);
            Ok(())
        });
        let mut ctx = Context::new(Request::new(Bytes::new()));
        h.call(&mut ctx).unwrap();
        assert_eq!(ctx.response_status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_handler_identity_equality() {
        let a = handler(|_: &mut Context| Ok(()));
        let b = handler(|_: &mut Context| Ok(()));

        assert_eq!(a, a.clone());
        assert!(a.ptr_eq(&a.clone()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_handler_chain_vectors_compare_by_identity() {
        let auth = handler(|_: &mut Context| Ok(()));
        let endpoint = handler(|_: &mut Context| Ok(()));

        let registered = vec![auth.clone(), endpoint.clone()];
        assert_eq!(registered, vec![auth.clone(), endpoint.clone()]);
        assert_ne!(registered, vec![endpoint, auth]);
    }

    #[test]
    fn test_handler_debug() {
        let h = handler(|_: &mut Context| Ok(()));
        assert!(format!("{h:?}").starts_with("Handler("));
    }
}
