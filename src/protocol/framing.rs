//! Length-prefixed message framing over stream transports.
//!
//! TCP delivers a byte stream with no message boundaries, so every message
//! exchanged by this crate is carried as a frame: a 4-byte little-endian
//! unsigned length followed by exactly that many payload bytes. This module
//! provides:
//!
//! - Reading frames, looping over partial reads until the declared payload
//!   is complete
//! - Writing frames with the length header prepended
//! - Rejection of oversized length declarations before any payload is read
//! - Typed send/receive wrappers for strings, integers and JSON values
//!
//! Reads never trust a single `read` call to fill a buffer: short reads are
//! normal on stream sockets and the loop keeps going until the frame is whole
//! or the stream ends. A clean end-of-stream on a frame boundary is reported
//! as [`FramingError::Closed`], distinct from a mid-frame truncation.

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use crate::protocol::error::FramingError;

/// Largest payload a peer may declare, in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 2_097_148;
/// How long a receive waits for a complete frame before giving up.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Reads exactly `buf.len()` bytes from a stream, looping over short reads.
///
/// `at_boundary` marks whether the stream is positioned between frames: an
/// immediate end-of-stream there is an ordinary close, while running dry
/// anywhere else means the peer quit mid-frame.
async fn read_full<S>(
    stream: &mut S,
    buf: &mut [u8],
    at_boundary: bool,
) -> Result<(), FramingError>
where
    S: AsyncRead + Unpin,
{
    let mut got = 0;
    while got < buf.len() {
        let n = stream.read(&mut buf[got..]).await?;
        if n == 0 {
            if got == 0 && at_boundary {
                return Err(FramingError::Closed);
            }
            return Err(FramingError::Truncated { got, expected: buf.len() });
        }
        got += n;
    }
    Ok(())
}

/// Reads a single length-prefixed frame from a stream.
///
/// Reads the 4-byte little-endian header, validates the declared length
/// against `max_frame_len` before touching the payload, then reads exactly
/// that many payload bytes.
async fn read_frame<S>(stream: &mut S, max_frame_len: usize) -> Result<Vec<u8>, FramingError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0_u8; 4];
    read_full(stream, &mut header, true).await?;
    let length = u32::from_le_bytes(header) as usize;
    trace!("Reading frame length:{}", length);
    if length > max_frame_len {
        return Err(FramingError::Oversize { length, max: max_frame_len });
    }
    let mut payload = vec![0_u8; length];
    read_full(stream, &mut payload, false).await?;
    Ok(payload)
}

/// Writes a single length-prefixed frame to a stream and flushes it.
async fn write_frame<S>(
    stream: &mut S,
    payload: &[u8],
    max_frame_len: usize,
) -> Result<(), FramingError>
where
    S: AsyncWrite + Unpin,
{
    if payload.len() > max_frame_len {
        return Err(FramingError::Oversize { length: payload.len(), max: max_frame_len });
    }
    // The header can carry less than a usize maximum would allow.
    let header = u32::try_from(payload.len())
        .map_err(|_| FramingError::Oversize { length: payload.len(), max: u32::MAX as usize })?;
    trace!("Writing frame length:{}", payload.len());
    stream.write_all(&header.to_le_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Frames messages over any asynchronous byte stream.
///
/// Wraps a stream and exchanges length-prefixed frames on it, byte payloads
/// at the bottom and typed payloads (UTF-8 strings, little-endian integers,
/// JSON values) layered on top. Every receive is bounded by the configured
/// read timeout; both directions enforce the configured maximum frame length.
#[derive(Debug)]
pub struct MessageFramer<S> {
    /// The wrapped transport
    stream: S,
    /// Bound on how long a receive may wait for a complete frame
    read_timeout: Duration,
    /// Largest payload either side may declare
    max_frame_len: usize,
}

impl<S> MessageFramer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream with the default read timeout and frame limit.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Replaces the read timeout, returning the previous value.
    pub fn set_read_timeout(&mut self, read_timeout: Duration) -> Duration {
        std::mem::replace(&mut self.read_timeout, read_timeout)
    }

    /// Replaces the maximum frame length, returning the previous value.
    pub fn set_max_frame_len(&mut self, max_frame_len: usize) -> usize {
        std::mem::replace(&mut self.max_frame_len, max_frame_len)
    }

    /// Returns the current read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the current maximum frame length.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Returns a mutable reference to the wrapped stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Sends one frame carrying the given payload.
    pub async fn send_bytes(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        write_frame(&mut self.stream, payload, self.max_frame_len).await
    }

    /// Receives one frame, returning its payload.
    ///
    /// Waits at most the configured read timeout for the complete frame,
    /// header and payload together.
    pub async fn recv_bytes(&mut self) -> Result<Vec<u8>, FramingError> {
        let deadline = self.read_timeout;
        match timeout(deadline, read_frame(&mut self.stream, self.max_frame_len)).await {
            Ok(result) => result,
            Err(_) => Err(FramingError::TimedOut(deadline)),
        }
    }

    /// Sends a frame carrying a UTF-8 string.
    pub async fn send_str(&mut self, value: &str) -> Result<(), FramingError> {
        self.send_bytes(value.as_bytes()).await
    }

    /// Receives a frame and decodes its payload as a UTF-8 string.
    pub async fn recv_str(&mut self) -> Result<String, FramingError> {
        let payload = self.recv_bytes().await?;
        String::from_utf8(payload).map_err(|e| FramingError::Decode(e.to_string()))
    }

    /// Sends a frame carrying one little-endian u32.
    pub async fn send_u32(&mut self, value: u32) -> Result<(), FramingError> {
        let mut payload = [0_u8; 4];
        LittleEndian::write_u32(&mut payload, value);
        self.send_bytes(&payload).await
    }

    /// Receives a frame and decodes its payload as one little-endian u32.
    pub async fn recv_u32(&mut self) -> Result<u32, FramingError> {
        let payload = self.recv_bytes().await?;
        if payload.len() != 4 {
            return Err(FramingError::Decode(format!(
                "integer frame carries {} bytes, expected 4",
                payload.len()
            )));
        }
        Ok(LittleEndian::read_u32(&payload))
    }

    /// Sends a frame carrying a JSON-serialized value.
    pub async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<(), FramingError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| FramingError::Decode(e.to_string()))?;
        self.send_bytes(&payload).await
    }

    /// Receives a frame and decodes its payload as JSON.
    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> Result<T, FramingError> {
        let payload = self.recv_bytes().await?;
        serde_json::from_slice(&payload).map_err(|e| FramingError::Decode(e.to_string()))
    }
}
