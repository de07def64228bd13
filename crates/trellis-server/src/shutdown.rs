//! Graceful shutdown coordination.
//!
//! A [`ShutdownSignal`] stops the accept loop and asks open connections to
//! finish their in-flight request. A [`ConnectionTracker`] counts the
//! connections still open so the listener can wait for them to drain. Both
//! are thin wrappers over a `tokio::sync::watch` value.
//!
//! # Example
//!
//! ```rust
//! use trellis_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//! let for_listener = shutdown.clone();
//!
//! shutdown.trigger();
//! assert!(for_listener.is_shutdown());
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable, idempotent shutdown trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    fired: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (fired, _) = watch::channel(false);
        Self {
            fired: Arc::new(fired),
        }
    }

    /// Triggers shutdown. Later calls do nothing.
    pub fn trigger(&self) {
        if !self.fired.send_replace(true) {
            tracing::debug!("shutdown triggered");
        }
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.fired.borrow()
    }

    /// Returns a future that resolves once shutdown is triggered.
    ///
    /// Resolves immediately when the signal already fired, and never when
    /// every clone of the signal is dropped untriggered.
    pub fn recv(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut fired = self.fired.subscribe();
        async move {
            let closed = fired.wait_for(|fired| *fired).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Creates a signal triggered by SIGINT or SIGTERM (Ctrl+C elsewhere).
    ///
    /// Must be called inside a Tokio runtime. If the OS handlers cannot be
    /// registered, a warning is logged and the signal only fires through
    /// [`trigger`](Self::trigger).
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            match wait_for_os_signal().await {
                Ok(name) => {
                    tracing::info!(signal = name, "shutdown signal received");
                    trigger.trigger();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to install OS signal handlers");
                }
            }
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

/// Counts open connections so shutdown can wait for them to close.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    open: Arc<watch::Sender<usize>>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        let (open, _) = watch::channel(0);
        Self {
            open: Arc::new(open),
        }
    }
}

impl ConnectionTracker {
    /// Creates a tracker with no open connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Dropping the token deregisters it.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.open.send_modify(|open| *open += 1);
        ConnectionToken {
            open: Arc::clone(&self.open),
        }
    }

    /// Number of connections currently open.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        *self.open.borrow()
    }

    /// Resolves once every token has been dropped.
    pub async fn drained(&self) {
        let mut open = self.open.subscribe();
        // the tracker owns the sender, so the channel cannot close here
        let _ = open.wait_for(|open| *open == 0).await;
    }
}

/// Held for the lifetime of one connection.
#[derive(Debug)]
pub struct ConnectionToken {
    open: Arc<watch::Sender<usize>>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        self.open.send_modify(|open| *open = open.saturating_sub(1));
    }
}
