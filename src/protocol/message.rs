//! Wire message shapes for the RPC protocol.
//!
//! Every message is a JSON object carried in one frame. Calls flow from
//! client to server and are tagged `"control"` (session setup) or `"invoke"`
//! (method call); replies flow back tagged `"OK"` or `"ERROR"`. Each call
//! carries a fresh id which the peer echoes in its reply, letting the caller
//! confirm that a reply belongs to the call it just made.
//!
//! Ids are drawn from a process-wide counter. The protocol is strictly
//! half-duplex per connection, so ids are only ever compared within one
//! connection; carrying them on the wire keeps the format compatible with
//! peers that correlate more aggressively.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection option value requesting a persistent session.
pub const KEEP_ALIVE: &str = "keep-alive";
/// Reply tag for success.
pub const STATUS_OK: &str = "OK";
/// Reply tag for a failed call.
pub const STATUS_ERROR: &str = "ERROR";

static CALL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Returns a fresh call id, strictly increasing within the process.
pub fn next_call_id() -> u64 {
    CALL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A client-to-server message: session setup or method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CallMessage {
    /// Opens a session. Sent exactly once, before any invocation.
    #[serde(rename = "control")]
    Control {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<SessionOptions>,
    },

    /// Invokes a registered method with a JSON argument object.
    #[serde(rename = "invoke")]
    Invoke { id: u64, app: String, method: String, args: Value },
}

impl CallMessage {
    /// Builds a session-opening control message with a fresh id.
    pub fn control(persistent: bool) -> Self {
        CallMessage::Control {
            id: next_call_id(),
            options: persistent.then(SessionOptions::keep_alive),
        }
    }

    /// Builds an invocation message with a fresh id.
    pub fn invoke(service: impl Into<String>, method: impl Into<String>, args: Value) -> Self {
        CallMessage::Invoke {
            id: next_call_id(),
            app: service.into(),
            method: method.into(),
            args,
        }
    }

    /// Returns the call id carried by this message.
    pub fn id(&self) -> u64 {
        match self {
            CallMessage::Control { id, .. } | CallMessage::Invoke { id, .. } => *id,
        }
    }
}

/// Options carried by a control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
}

impl SessionOptions {
    /// Options requesting a persistent session.
    pub fn keep_alive() -> Self {
        SessionOptions { connection: Some(KEEP_ALIVE.to_string()) }
    }

    /// Whether these options ask the server to keep the session open.
    pub fn wants_keep_alive(&self) -> bool {
        self.connection.as_deref() == Some(KEEP_ALIVE)
    }
}

/// A server-to-client reply: handshake acknowledgment or call response.
///
/// Success replies carry `"OK"` and, for invocations, a `value`; failure
/// replies carry `"ERROR"` and a `msg`. Foreign peers may answer a handshake
/// with any other tag, so the tag is kept as a string rather than an enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(rename = "type")]
    pub status: String,
    #[serde(default)]
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ReplyMessage {
    /// A bare acknowledgment, as sent for a successful handshake.
    pub fn ok(id: u64) -> Self {
        ReplyMessage { status: STATUS_OK.to_string(), id, value: None, msg: None }
    }

    /// A successful call response carrying the handler's result.
    pub fn result(id: u64, value: Value) -> Self {
        ReplyMessage { status: STATUS_OK.to_string(), id, value: Some(value), msg: None }
    }

    /// A failure response carrying a message for the caller.
    pub fn error(id: u64, msg: impl Into<String>) -> Self {
        ReplyMessage {
            status: STATUS_ERROR.to_string(),
            id,
            value: None,
            msg: Some(msg.into()),
        }
    }

    /// Whether this reply reports success.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}
