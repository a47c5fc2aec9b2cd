//! The TCP module provides the server side of the RPC engine.
//!
//! This module implements a TCP listener that:
//! - Accepts connections from RPC clients
//! - Spawns an isolated session task per accepted connection
//! - Routes invocations to handlers registered in the dispatch table
//! - Shuts down cooperatively when signalled
//!
//! A failing session never disturbs the accept loop or any other session:
//! every per-connection error is caught at the task boundary, logged, and
//! ends only that connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::handler::{DispatchTable, RpcHandler};
use crate::protocol::error::AlreadyRegistered;
use crate::protocol::framing::{DEFAULT_MAX_FRAME_LEN, DEFAULT_READ_TIMEOUT};
use crate::protocol::{session, Context};
use crate::shutdown::{self, ShutdownHandle, ShutdownToken};

/// How long one accept attempt waits before the loop re-checks for shutdown.
const DEFAULT_ACCEPT_INTERVAL: Duration = Duration::from_millis(500);

/// Tunable limits for a listener and the sessions it spawns.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bound on how long a session waits for the next message from its client
    pub read_timeout: Duration,
    /// Granularity at which the accept loop re-checks for shutdown
    pub accept_interval: Duration,
    /// Largest frame a session will accept or send
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            accept_interval: DEFAULT_ACCEPT_INTERVAL,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// RPC connection handler that listens for incoming client connections and
/// serves each one on its own task.
pub struct RpcListener {
    /// TCP listener for accepting incoming connections
    listener: TcpListener,
    /// Address the listener is actually bound to
    local_addr: SocketAddr,
    /// Table of registered handlers shared with every session
    dispatch: Arc<DispatchTable>,
    /// Limits applied to the accept loop and to each session
    config: ServerConfig,
    /// Signal side of the cooperative shutdown channel
    shutdown: ShutdownHandle,
    /// Observer side handed to the accept loop and to sessions
    token: ShutdownToken,
}

impl RpcListener {
    /// Creates a listener bound to the specified IP address and port, with
    /// default configuration.
    ///
    /// # Arguments
    ///
    /// * `ipstr` - IP address and port in the format "IP:PORT"
    ///   (e.g. "127.0.0.1:46999"). Port 0 asks the operating system to pick
    ///   a free port; see [`RpcListener::local_port`] for the result.
    pub async fn bind(ipstr: &str) -> io::Result<RpcListener> {
        RpcListener::bind_with_config(ipstr, ServerConfig::default()).await
    }

    /// Creates a listener bound to the specified IP address and port.
    pub async fn bind_with_config(ipstr: &str, config: ServerConfig) -> io::Result<RpcListener> {
        let (ip, port) = ipstr.split_once(':').ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "Listen address must be of form ip:port",
            )
        })?;
        let port = port.parse::<u16>().map_err(|_| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "Port not in range 0..=65535")
        })?;
        let listener = TcpListener::bind(format!("{ip}:{port}")).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {:?}", local_addr);

        let (shutdown, token) = shutdown::channel();
        Ok(RpcListener {
            listener,
            local_addr,
            dispatch: Arc::new(DispatchTable::new()),
            config,
            shutdown,
            token,
        })
    }

    /// Returns the actual port number on which the server is listening.
    ///
    /// This is especially useful when binding to port 0, which allows the OS
    /// to assign any available port. After binding, this method can be used
    /// to determine which port was actually assigned.
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registers a handler under a service and method name.
    ///
    /// Registration may happen before or while the listener is serving; new
    /// registrations are visible to the next lookup. Registering a pair that
    /// already has a handler is rejected.
    pub fn register_handler(
        &self,
        service: impl Into<String>,
        method: impl Into<String>,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<(), AlreadyRegistered> {
        self.dispatch.register(service, method, handler)
    }

    /// Returns a handle that stops [`RpcListener::serve`] and wakes idle
    /// sessions when signalled.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accepts client connections until shutdown is signalled.
    ///
    /// Each accepted connection gets its own context and its own spawned
    /// session task. Accept attempts are bounded by the configured accept
    /// interval so the loop notices shutdown promptly even when `accept`
    /// itself would not wake; an elapsed interval is normal and not logged.
    /// A failed accept is logged and the loop keeps going.
    pub async fn serve(&self) -> io::Result<()> {
        loop {
            let accepted = tokio::select! {
                _ = self.token.signalled() => {
                    info!("Listener on {:?} stopping", self.local_addr);
                    return Ok(());
                }
                accepted = timeout(self.config.accept_interval, self.listener.accept()) => accepted,
            };
            let (socket, peer_addr) = match accepted {
                // Poll interval elapsed with no connection. Loop back and
                // re-check for shutdown.
                Err(_) => continue,
                Ok(Err(e)) => {
                    warn!("Accept failed: {:?}", e);
                    continue;
                }
                Ok(Ok(pair)) => pair,
            };

            let context = Context {
                local_port: self.local_addr.port(),
                client_addr: peer_addr.to_string(),
                dispatch: self.dispatch.clone(),
                read_timeout: self.config.read_timeout,
                max_frame_len: self.config.max_frame_len,
                shutdown: self.token.clone(),
            };
            info!("Accepting connection from {}", context.client_addr);
            debug!("Accepting socket {:?} {:?}", socket, context);
            tokio::spawn(async move {
                let client_addr = context.client_addr.clone();
                if let Err(e) = session::run(socket, context).await {
                    debug!("Session with {} ended: {:?}", client_addr, e);
                }
            });
        }
    }
}
