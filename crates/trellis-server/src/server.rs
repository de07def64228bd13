//! HTTP/1.1 listener.
//!
//! Accepts connections with Tokio, speaks HTTP/1.1 with Hyper, buffers each
//! request body up to the configured limit and runs the synchronous
//! dispatcher on the blocking pool.
//!
//! ```text
//! accept ──► connection task ──► collect body (≤ max_body_bytes)
//!                                   │ too large ─► 413
//!                                   ▼
//!                          spawn_blocking(dispatch)
//!                                   │ fault ─► close connection
//!                                   ▼
//!                               flush response
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::engine::Engine;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Body type sent to clients.
pub type ResponseBody = Full<Bytes>;

impl Engine {
    /// Binds `addr` and serves until the process exits.
    ///
    /// The post-bind callback, if any, runs once the listener is bound and
    /// before the first connection is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be bound.
    pub async fn start(self, addr: &str) -> Result<(), ServerError> {
        // never triggered, so this serves forever
        let shutdown = ShutdownSignal::new();
        self.start_with_shutdown(addr, shutdown).await
    }

    /// Binds `addr` and serves until `shutdown` is triggered.
    ///
    /// After the trigger no new connections are accepted; open connections
    /// finish their in-flight request and then close. The call returns once
    /// they are all closed or the configured shutdown timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be bound, or
    /// [`ServerError::Io`] when the bound address cannot be read.
    pub async fn start_with_shutdown(
        self,
        addr: &str,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        if let Some(on_bound) = self.take_on_bound() {
            on_bound(&listener);
        }

        let local_addr = listener.local_addr()?;
        for (method, pattern) in self.routes() {
            tracing::debug!(%method, pattern, "route");
        }
        tracing::info!(addr = %local_addr, routes = self.router().len(), "listening");

        let engine = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let engine = Arc::clone(&engine);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(err) = serve_connection(engine, stream, shutdown).await {
                                tracing::debug!(%remote_addr, error = %err, "connection ended with error");
                            }
                            drop(token);
                        });
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to accept connection");
                    }
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown triggered, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let timeout = engine.config().shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "waiting for open connections"
        );
        tokio::select! {
            () = tracker.drained() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    engine: Arc<Engine>,
    stream: TcpStream,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let keep_alive = engine.config().keep_alive();
    let service = service_fn(move |request: Request<Incoming>| {
        let engine = Arc::clone(&engine);
        async move { handle_request(engine, request).await }
    });

    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

/// Buffers the body, dispatches, and maps the outcome for Hyper.
///
/// Returning `Err` makes Hyper drop the connection without a response, which
/// is how an unrecovered fault ends a request.
async fn handle_request(
    engine: Arc<Engine>,
    request: Request<Incoming>,
) -> Result<Response<ResponseBody>, ServerError> {
    let limit = engine.config().max_body_bytes();
    let (parts, body) = request.into_parts();

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(
                method = %parts.method,
                path = parts.uri.path(),
                limit,
                "request body exceeds limit"
            );
            return Ok(plain_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "413 PAYLOAD TOO LARGE",
            ));
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return Ok(plain_response(StatusCode::BAD_REQUEST, "400 BAD REQUEST"));
        }
    };

    let request = Request::from_parts(parts, body);
    let outcome = tokio::task::spawn_blocking(move || engine.dispatch(request)).await?;

    match outcome {
        Ok(response) => Ok(response.map(Full::new)),
        Err(fault) => {
            tracing::error!(error = %fault, "unrecovered fault, closing connection");
            Err(fault.into())
        }
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
