//! Connection handling abstractions for the listener.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Per-connection information handed to a handler.
#[derive(Debug, Clone)]
pub(crate) struct SessionContext {
    /// Remote address of the client.
    pub(crate) peer: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl SessionContext {
    pub(crate) fn new(peer: SocketAddr, shutdown: Arc<AtomicBool>) -> Self {
        Self { peer, shutdown }
    }

    /// Raised when the listener is shutting down; sessions should return.
    pub(crate) fn shutdown(&self) -> &AtomicBool {
        &self.shutdown
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until it ends. Implementations should avoid
    /// panicking and should poll the shutdown flag.
    fn handle(&self, stream: TcpStream, context: SessionContext);
}
