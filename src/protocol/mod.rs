//! Protocol module implements the wire side of the RPC engine.
//!
//! This module contains four main components:
//!
//! - `framing`: length-prefixed message framing over stream transports,
//!   with typed send/receive wrappers.
//!
//! - `message`: the JSON message shapes exchanged by clients and servers,
//!   covering session setup, invocation and replies.
//!
//! - `session`: the server-side state machine run for each accepted
//!   connection, from handshake through dispatch to termination.
//!
//! - `error`: the framing and RPC error taxonomies.
//!
//! The protocol is strictly half-duplex per connection: a client sends one
//! call and awaits its reply before sending the next, and the server never
//! sends unsolicited messages.

pub mod error;
pub mod framing;
pub mod message;
pub mod session;

mod context;

pub use context::Context;
