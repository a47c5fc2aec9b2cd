//! Wirecall - a minimal framed-RPC engine over TCP
//!
//! This library implements a small remote procedure call protocol directly on
//! top of TCP streams, letting one Rust process expose named methods and
//! another call them with JSON arguments.
//!
//! ## Supported Features
//!
//! - Length-prefixed message framing over any stream transport
//! - Handshake-based session setup with optional persistent connections
//! - Synchronous call semantics: one invocation in flight per connection
//! - Server dispatcher routing calls to registered handlers
//! - Per-connection failure isolation on the server
//! - Cooperative shutdown that stops the accept loop and wakes idle sessions
//! - Asynchronous operation with Tokio runtime
//!
//! ## Main Components
//!
//! - `handler`: The handler API that must be implemented to expose methods
//!   over RPC, and the dispatch table that routes calls to them.
//!
//! - `tcp`: TCP-based server implementation that accepts client connections
//!   and serves each one on its own task.
//!
//! - `client`: The caller side, owning one connection and issuing calls.
//!
//! - `protocol`: Internal module that implements framing, the wire message
//!   shapes and the per-connection session state machine.
//!
//! ## Usage
//!
//! To expose methods, register [`RpcHandler`] implementations on an
//! [`RpcListener`] and call [`RpcListener::serve`]. To call them, connect an
//! [`RpcClient`] (or use [`invoke_once`] for a one-shot call).

pub mod client;
pub mod handler;
pub mod protocol;
pub mod shutdown;
pub mod tcp;

pub use client::{invoke_once, ClientConfig, RpcClient};
pub use handler::{handler_fn, DispatchTable, RpcHandler};
pub use protocol::error::{AlreadyRegistered, FramingError, RpcError};
pub use shutdown::{ShutdownHandle, ShutdownToken};
pub use tcp::{RpcListener, ServerConfig};
