//! Per-connection session loop.
//!
//! A session reads whatever bytes arrive, appends them to its buffer, and
//! after every read tries to parse complete JSON documents from the front of
//! the buffer. There is no delimiter: a document is complete when it parses.
//! Each document yields exactly one response, written in full before the next
//! read. Incomplete or unparseable input waits for more bytes until the
//! buffer passes the configured ceiling, at which point the client receives a
//! `request too large` error and the connection closes.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Deserializer, Value};
use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, SessionContext};

use super::errors::DispatchError;
use super::request::Command;
use super::response::{Response, ResponseWriter};
use super::router::{CommandRouter, DISPATCH_TARGET};

const READ_CHUNK: usize = 8 * 1024;
/// Read timeout used so an idle session notices shutdown.
pub(crate) const SESSION_POLL: Duration = Duration::from_millis(100);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    PeerClosed,
    Shutdown,
    ReadFailed,
    WriteFailed,
    RequestTooLarge,
}

/// Connection handler that runs one command session per connection.
pub(crate) struct BridgeConnectionHandler {
    router: Arc<CommandRouter>,
    max_request_bytes: usize,
}

impl BridgeConnectionHandler {
    pub(crate) fn new(router: Arc<CommandRouter>, max_request_bytes: usize) -> Self {
        Self {
            router,
            max_request_bytes,
        }
    }
}

impl ConnectionHandler for BridgeConnectionHandler {
    fn handle(&self, mut stream: TcpStream, context: SessionContext) {
        if let Err(error) = stream.set_read_timeout(Some(SESSION_POLL)) {
            warn!(
                target: DISPATCH_TARGET,
                peer = %context.peer,
                %error,
                "failed to configure session read timeout"
            );
            return;
        }
        let end = Session::new(&self.router, self.max_request_bytes)
            .run(&mut stream, context.shutdown());
        debug!(
            target: DISPATCH_TARGET,
            peer = %context.peer,
            ?end,
            "session ended"
        );
    }
}

/// State of one client session.
pub(crate) struct Session<'a> {
    router: &'a CommandRouter,
    max_request_bytes: usize,
    buffer: Vec<u8>,
    failed_error_sends: u8,
}

impl<'a> Session<'a> {
    pub(crate) fn new(router: &'a CommandRouter, max_request_bytes: usize) -> Self {
        Self {
            router,
            max_request_bytes,
            buffer: Vec::new(),
            failed_error_sends: 0,
        }
    }

    /// Serves the stream until the peer closes, a transport error occurs, or
    /// `shutdown` is raised.
    pub(crate) fn run<S: Read + Write>(
        mut self,
        stream: &mut S,
        shutdown: &AtomicBool,
    ) -> SessionEnd {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return SessionEnd::Shutdown;
            }
            let read = match stream.read(&mut chunk) {
                Ok(0) => return SessionEnd::PeerClosed,
                Ok(read) => read,
                Err(error) if is_retryable(&error) => continue,
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "session read failed");
                    return SessionEnd::ReadFailed;
                }
            };
            self.buffer
                .extend_from_slice(chunk.get(..read).unwrap_or_default());
            if let Some(end) = self.drain_documents(stream) {
                return end;
            }
            if self.buffer.len() > self.max_request_bytes {
                let error =
                    DispatchError::request_too_large(self.buffer.len(), self.max_request_bytes);
                warn!(target: DISPATCH_TARGET, %error, "closing session");
                // The connection closes either way.
                let _ = self.send(stream, &Response::error(&error));
                return SessionEnd::RequestTooLarge;
            }
        }
    }

    fn drain_documents<W: Write>(&mut self, stream: &mut W) -> Option<SessionEnd> {
        let (documents, consumed) = split_documents(&self.buffer);
        self.buffer.drain(..consumed);
        for document in documents {
            let response = self.respond(document);
            if let Err(end) = self.send(stream, &response) {
                return Some(end);
            }
        }
        None
    }

    fn respond(&self, document: Value) -> Response {
        match Command::from_value(document) {
            Ok(command) => self.router.route(command),
            Err(error) => Response::error(&error),
        }
    }

    /// Writes a response. One failed error response is tolerated; a second in
    /// a row, or any failed success response, ends the session.
    fn send<W: Write>(&mut self, stream: &mut W, response: &Response) -> Result<(), SessionEnd> {
        match ResponseWriter::new(&mut *stream).write_response(response) {
            Ok(()) => {
                self.failed_error_sends = 0;
                Ok(())
            }
            Err(error) if response.is_error() && self.failed_error_sends == 0 => {
                self.failed_error_sends += 1;
                warn!(
                    target: DISPATCH_TARGET,
                    %error,
                    "failed to send error response"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %error,
                    "failed to send response; closing session"
                );
                Err(SessionEnd::WriteFailed)
            }
        }
    }
}

/// Parses every complete document at the front of `buffer`.
///
/// Returns the documents and how many bytes they used. Parsing stops at the
/// first incomplete or malformed document; those bytes stay buffered.
pub(crate) fn split_documents(buffer: &[u8]) -> (Vec<Value>, usize) {
    let mut documents = Vec::new();
    let mut consumed = 0;
    let mut stream = Deserializer::from_slice(buffer).into_iter::<Value>();
    loop {
        match stream.next() {
            Some(Ok(document)) => {
                documents.push(document);
                consumed = stream.byte_offset();
            }
            // Only whitespace remains.
            None => {
                consumed = buffer.len();
                break;
            }
            Some(Err(_)) => break,
        }
    }
    (documents, consumed)
}

fn is_retryable(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests;
