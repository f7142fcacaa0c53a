//! Test helpers for the transport module.

use std::io::Read;
use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use super::{ConnectionHandler, SessionContext};

/// Counts connections and returns immediately.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream, _context: SessionContext) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps each connection open until released, optionally ignoring shutdown.
pub(crate) struct HoldingHandler {
    release: Arc<AtomicBool>,
    honour_shutdown: bool,
}

impl HoldingHandler {
    pub(crate) fn new(honour_shutdown: bool) -> (Arc<AtomicBool>, Arc<Self>) {
        let release = Arc::new(AtomicBool::new(false));
        let handler = Arc::new(Self {
            release: Arc::clone(&release),
            honour_shutdown,
        });
        (release, handler)
    }
}

impl ConnectionHandler for HoldingHandler {
    fn handle(&self, mut stream: TcpStream, context: SessionContext) {
        let _ = stream.set_read_timeout(Some(Duration::from_millis(10)));
        let mut scratch = [0_u8; 64];
        loop {
            if self.release.load(Ordering::SeqCst) {
                return;
            }
            if self.honour_shutdown && context.shutdown().load(Ordering::SeqCst) {
                return;
            }
            if matches!(stream.read(&mut scratch), Ok(0)) {
                return;
            }
        }
    }
}
