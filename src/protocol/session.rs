//! Server side of one RPC connection.
//!
//! A session walks a small state machine over its framed stream:
//!
//! 1. Handshake: the first message must be a control message. Anything else
//!    closes the connection without an acknowledgment. The control message's
//!    options decide whether the session is persistent.
//! 2. Serving: read one invocation, dispatch it, reply, then loop while the
//!    session is persistent. A read timeout or the client closing between
//!    calls is an ordinary end of session, not an error.
//!
//! A handler failure is answered with an error response and ends the session
//! even when it is persistent. An invocation naming an unregistered method
//! ends the session with no response at all. Every terminal error is returned
//! to the spawning task, which logs it; nothing a session does can unseat the
//! accept loop or any other session.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, error, trace, warn};

use crate::protocol::error::{FramingError, RpcError};
use crate::protocol::framing::MessageFramer;
use crate::protocol::message::{CallMessage, ReplyMessage, SessionOptions};
use crate::protocol::Context;

/// Serves one accepted TCP connection until it terminates.
pub async fn run(socket: TcpStream, context: Context) -> Result<(), RpcError> {
    let _ = socket.set_nodelay(true);
    let mut framer = MessageFramer::new(socket);
    framer.set_read_timeout(context.read_timeout);
    framer.set_max_frame_len(context.max_frame_len);
    serve(&mut framer, &context).await
}

/// Serves one session over any framed stream.
///
/// Performs the server half of the handshake, then dispatches invocations
/// until the session ends. Exposed separately from [`run`] so sessions can be
/// driven over transports other than plain TCP.
pub async fn serve<S>(framer: &mut MessageFramer<S>, context: &Context) -> Result<(), RpcError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let persistent = handshake(framer, context).await?;
    loop {
        let message = tokio::select! {
            _ = context.shutdown.signalled() => {
                debug!("Session with {} closing for shutdown", context.client_addr);
                return Ok(());
            }
            received = framer.recv_json::<CallMessage>() => match received {
                Ok(message) => message,
                Err(FramingError::TimedOut(_)) => {
                    debug!("Session with {} idled out", context.client_addr);
                    return Ok(());
                }
                Err(FramingError::Closed) => {
                    debug!("Session with {} ended by peer", context.client_addr);
                    return Ok(());
                }
                Err(other) => return Err(other.into()),
            },
        };

        let (id, app, method, args) = match message {
            CallMessage::Invoke { id, app, method, args } => (id, app, method, args),
            CallMessage::Control { .. } => {
                return Err(RpcError::Protocol(
                    "control message received after handshake".to_string(),
                ));
            }
        };

        let Some(handler) = context.dispatch.lookup(&app, &method) else {
            warn!("No handler registered for {}.{}, dropping {}", app, method, context.client_addr);
            return Err(RpcError::Dispatch { service: app, method });
        };

        trace!("Invoking {}.{} id:{} for {}", app, method, id, context.client_addr);
        match handler.handle(args).await {
            Ok(value) => {
                framer.send_json(&ReplyMessage::result(id, value)).await?;
                if !persistent {
                    debug!("Session with {} complete", context.client_addr);
                    return Ok(());
                }
            }
            Err(e) => {
                warn!("Handler {}.{} failed: {:#}", app, method, e);
                let reply = ReplyMessage::error(id, format!("{e:#}"));
                if let Err(e) = framer.send_json(&reply).await {
                    error!("Write error {:?}", e);
                }
                return Ok(());
            }
        }
    }
}

/// Performs the server half of the handshake.
///
/// Returns whether the negotiated session is persistent. The acknowledgment
/// echoes the control message's id; no acknowledgment of any kind is sent
/// when the first message is not a control message.
async fn handshake<S>(framer: &mut MessageFramer<S>, context: &Context) -> Result<bool, RpcError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let message = match framer.recv_json::<CallMessage>().await {
        Ok(message) => message,
        Err(FramingError::TimedOut(_)) => {
            return Err(RpcError::Handshake("no control message before timeout".to_string()));
        }
        Err(FramingError::Closed) => {
            return Err(RpcError::Handshake("peer closed before handshake".to_string()));
        }
        Err(other) => return Err(other.into()),
    };
    match message {
        CallMessage::Control { id, options } => {
            let persistent = options.as_ref().is_some_and(SessionOptions::wants_keep_alive);
            framer.send_json(&ReplyMessage::ok(id)).await?;
            debug!(
                "Session with {} established, persistent:{}",
                context.client_addr, persistent
            );
            Ok(persistent)
        }
        CallMessage::Invoke { .. } => Err(RpcError::Protocol(
            "session must open with a control message".to_string(),
        )),
    }
}
