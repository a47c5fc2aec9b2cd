//! Client side of the RPC engine.
//!
//! [`RpcClient`] owns one connection to an RPC server. Connecting performs
//! the control handshake; afterwards [`RpcClient::invoke`] sends one call at
//! a time and awaits its response. The protocol is strictly half-duplex, and
//! `invoke` taking `&mut self` makes a second in-flight call on the same
//! connection unrepresentable.
//!
//! A connection is either persistent (many invoke/response cycles) or
//! one-shot (exactly one cycle, as negotiated at handshake). For the common
//! connect-call-close pattern, [`invoke_once`] does all three in one step.

use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

use crate::protocol::error::{FramingError, RpcError};
use crate::protocol::framing::{MessageFramer, DEFAULT_MAX_FRAME_LEN, DEFAULT_READ_TIMEOUT};
use crate::protocol::message::{CallMessage, ReplyMessage};

/// Handshake failure message used when the server's rejection carries none.
const DEFAULT_REJECTION: &str = "The server is not configured to respond to RPC calls";

/// Tunable limits for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on how long the handshake waits for the server's acknowledgment
    pub handshake_timeout: Duration,
    /// Largest frame the connection will accept or send
    pub max_frame_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// One client connection to an RPC server.
#[derive(Debug)]
pub struct RpcClient {
    /// Framed transport to the server
    framer: MessageFramer<TcpStream>,
    /// Whether the session was negotiated as persistent
    persistent: bool,
    /// Set once the connection is spent or torn down
    closed: bool,
    /// Server address, for logging
    peer: String,
}

impl RpcClient {
    /// Connects to a server and performs the handshake, with default
    /// configuration.
    ///
    /// When `persistent` is true the connection asks to stay open across
    /// calls; otherwise it is good for exactly one invoke/response cycle.
    pub async fn connect(addr: impl ToSocketAddrs, persistent: bool) -> Result<RpcClient, RpcError> {
        RpcClient::connect_with_config(addr, persistent, ClientConfig::default()).await
    }

    /// Connects to a server and performs the handshake.
    ///
    /// Fails with [`RpcError::Handshake`] when the server rejects the session
    /// or never acknowledges it, and with [`RpcError::Protocol`] when the
    /// acknowledgment is malformed or answers a different call id.
    pub async fn connect_with_config(
        addr: impl ToSocketAddrs,
        persistent: bool,
        config: ClientConfig,
    ) -> Result<RpcClient, RpcError> {
        let socket = TcpStream::connect(addr).await?;
        let _ = socket.set_nodelay(true);
        let peer = socket.peer_addr()?.to_string();
        let mut framer = MessageFramer::new(socket);
        framer.set_read_timeout(config.handshake_timeout);
        framer.set_max_frame_len(config.max_frame_len);

        let hello = CallMessage::control(persistent);
        let hello_id = hello.id();
        framer.send_json(&hello).await?;
        let ack: ReplyMessage = match framer.recv_json().await {
            Ok(ack) => ack,
            Err(FramingError::TimedOut(_)) => {
                return Err(RpcError::Handshake("no acknowledgment before timeout".to_string()));
            }
            Err(FramingError::Closed) => {
                return Err(RpcError::Handshake(
                    "connection closed before acknowledgment".to_string(),
                ));
            }
            Err(other) => return Err(other.into()),
        };
        if !ack.is_ok() {
            return Err(RpcError::Handshake(
                ack.msg.unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
            ));
        }
        if ack.id != hello_id {
            return Err(RpcError::Protocol(format!(
                "acknowledgment answers id {}, control message carried id {}",
                ack.id, hello_id
            )));
        }

        debug!("Connected to {}, persistent:{}", peer, persistent);
        Ok(RpcClient { framer, persistent, closed: false, peer })
    }

    /// Whether the session was negotiated as persistent.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Invokes a method on the server and returns its result value.
    ///
    /// Sends one invocation and waits up to `timeout` for the response.
    /// Failures:
    ///
    /// - [`RpcError::Timeout`] when no response arrives in time
    /// - [`RpcError::Remote`] when the handler ran and failed
    /// - [`RpcError::Protocol`] for malformed or misaddressed responses
    ///
    /// Any failure spends the connection, as does a completed call on a
    /// non-persistent connection; later invokes fail without touching the
    /// network.
    pub async fn invoke(
        &mut self,
        service: &str,
        method: &str,
        args: Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        if self.closed {
            return Err(RpcError::Protocol("connection already closed".to_string()));
        }
        self.framer.set_read_timeout(timeout);
        let call = CallMessage::invoke(service, method, args);
        let call_id = call.id();
        trace!("Invoking {}.{} id:{} on {}", service, method, call_id, self.peer);

        let result = self.exchange(call, call_id).await;
        if result.is_err() || !self.persistent {
            self.close().await;
        }
        result
    }

    async fn exchange(&mut self, call: CallMessage, call_id: u64) -> Result<Value, RpcError> {
        self.framer.send_json(&call).await?;
        let reply: ReplyMessage = self.framer.recv_json().await?;
        if reply.id != call_id {
            return Err(RpcError::Protocol(format!(
                "response answers id {}, call carried id {}",
                reply.id, call_id
            )));
        }
        if !reply.is_ok() {
            return Err(RpcError::Remote(
                reply.msg.unwrap_or_else(|| "remote call failed".to_string()),
            ));
        }
        reply.value.ok_or_else(|| RpcError::Protocol("OK response carries no value".to_string()))
    }

    /// Closes the connection. Idempotent; dropping the client also releases
    /// the connection.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.framer.get_mut().shutdown().await {
            trace!("Shutdown of connection to {} failed: {:?}", self.peer, e);
        }
    }
}

/// Connects, invokes one method and closes the connection.
///
/// The session is negotiated non-persistent, matching its single
/// invoke/response cycle.
pub async fn invoke_once(
    addr: impl ToSocketAddrs,
    service: &str,
    method: &str,
    args: Value,
    timeout: Duration,
) -> Result<Value, RpcError> {
    let mut client = RpcClient::connect(addr, false).await?;
    let result = client.invoke(service, method, args, timeout).await;
    client.close().await;
    result
}
