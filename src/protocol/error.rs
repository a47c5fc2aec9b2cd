//! Error types for the framing layer and the RPC protocol engine.
//!
//! Two layers of errors are exposed:
//!
//! - [`FramingError`] covers everything that can go wrong while moving a
//!   single length-prefixed frame across a stream: oversized declarations,
//!   truncation, timeouts, undecodable payloads.
//!
//! - [`RpcError`] is the public error type of the client and server. Framing
//!   failures are folded into it, with timeouts and decode failures promoted
//!   to their protocol-level meanings.
//!
//! Handler code is free to fail with any [`anyhow::Error`]; the dispatcher
//! converts those into error responses on the wire.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while reading or writing a single frame.
#[derive(Error, Debug)]
pub enum FramingError {
    /// The frame header declared a length above the configured maximum.
    /// Raised before any payload byte is read.
    #[error("frame length {length} exceeds maximum {max}")]
    Oversize { length: usize, max: usize },

    /// The stream ended partway through a frame.
    #[error("stream ended mid-frame after {got} of {expected} bytes")]
    Truncated { got: usize, expected: usize },

    /// The stream ended cleanly on a frame boundary.
    #[error("stream closed")]
    Closed,

    /// No complete frame arrived within the read timeout.
    #[error("read timed out after {0:?}")]
    TimedOut(Duration),

    /// The payload could not be decoded as the requested type.
    #[error("undecodable payload: {0}")]
    Decode(String),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced by the RPC client and server.
#[derive(Error, Debug)]
pub enum RpcError {
    /// A frame could not be read or written.
    #[error("framing error: {0}")]
    Framing(FramingError),

    /// The control handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The peer sent a malformed or out-of-order message.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// No response arrived within the caller's deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// An invocation named a service/method pair with no registered handler.
    #[error("no handler registered for {service}.{method}")]
    Dispatch { service: String, method: String },

    /// The remote handler ran and failed; carries the server's message.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The underlying connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<FramingError> for RpcError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::TimedOut(after) => RpcError::Timeout(after),
            FramingError::Decode(msg) => RpcError::Protocol(msg),
            other => RpcError::Framing(other),
        }
    }
}

/// Returned by handler registration when the service/method pair is taken.
/// The existing registration is left in place.
#[derive(Error, Debug)]
#[error("a handler is already registered for {service}.{method}")]
pub struct AlreadyRegistered {
    pub service: String,
    pub method: String,
}
