//! Session-guard middleware.

use http::StatusCode;
use trellis_core::{Context, Handler, HandlerResult};

use crate::manager::Manager;

fn unauthorized(ctx: &mut Context) -> HandlerResult {
    ctx.abort_with_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

/// Requires a live session for every downstream handler.
///
/// Requests without one are passed to `on_missing` (401 and abort by
/// default) and the rest of the chain is skipped. After the chain runs, a
/// session that was modified is saved; a failed save turns the response
/// into a 500.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trellis_session::{need_session, Manager};
///
/// let manager = Manager::in_memory(Duration::from_secs(1800));
/// let guard = need_session(manager.clone(), None);
/// ```
#[must_use]
pub fn need_session(manager: Manager, on_missing: Option<Handler>) -> Handler {
    let on_missing = on_missing.unwrap_or_else(|| Handler::new(unauthorized));

    Handler::new(move |ctx: &mut Context| {
        let session = match manager.get_session(ctx) {
            Ok(session) => session,
            Err(err) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    error = %err,
                    "request rejected without session"
                );
                // skip the route unless the handler chose to continue
                let result = on_missing.call(ctx);
                if !ctx.is_aborted() {
                    ctx.abort();
                }
                return result;
            }
        };

        ctx.next()?;

        if session.is_modified() {
            if let Err(err) = manager.save_session(ctx, &session) {
                tracing::error!(
                    session_id = session.id(),
                    error = %err,
                    "failed to save session"
                );
                ctx.abort_with_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
        Ok(())
    })
}
