//! Cooperative shutdown signalling for the listener and its sessions.
//!
//! Shutdown is modeled as an explicit pair of handles over a
//! [`tokio::sync::watch`] channel rather than a shared flag: a
//! [`ShutdownHandle`] to request shutdown, and any number of
//! [`ShutdownToken`]s observing it. The accept loop and every connection
//! task hold a token, so an idle session wakes and exits as soon as shutdown
//! is requested instead of waiting out its read timeout.

use std::sync::Arc;

use tokio::sync::watch;

/// Creates a connected shutdown handle and token.
pub fn channel() -> (ShutdownHandle, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx: Arc::new(tx) }, ShutdownToken { rx })
}

/// Requests shutdown. Clonable; any clone may signal.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Signals shutdown to every token. Idempotent.
    pub fn signal(&self) {
        let _ = self.tx.send(true);
    }

    /// Creates another token observing this handle.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken { rx: self.tx.subscribe() }
    }
}

/// Observes a shutdown request. Clonable; held by the accept loop and by
/// every connection task.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Whether shutdown has been signalled.
    pub fn is_signalled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once shutdown is signalled. Also completes if every handle
    /// has been dropped, so orphaned tasks do not linger.
    pub async fn signalled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}
