//! Per-connection context handed to each session task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::handler::DispatchTable;
use crate::shutdown::ShutdownToken;

/// Execution context for one accepted connection.
///
/// Bundles everything a session task needs to serve its client: the shared
/// dispatch table, the session limits inherited from the server
/// configuration, and the shutdown token. Each accepted connection gets its
/// own clone, keeping sessions isolated from one another.
#[derive(Clone)]
pub struct Context {
    /// Port number on which the server is listening
    pub local_port: u16,

    /// Client's network address (IP:port) used for logging
    pub client_addr: String,

    /// Shared table of registered handlers
    pub dispatch: Arc<DispatchTable>,

    /// Bound on how long the session waits for the next message
    pub read_timeout: Duration,

    /// Largest frame the session will accept or send
    pub max_frame_len: usize,

    /// Observes server shutdown, waking idle sessions
    pub shutdown: ShutdownToken,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("local_port", &self.local_port)
            .field("client_addr", &self.client_addr)
            .field("read_timeout", &self.read_timeout)
            .field("max_frame_len", &self.max_frame_len)
            .finish()
    }
}
