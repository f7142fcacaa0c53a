//! Bookkeeping for live session threads.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::warn;

use super::LISTENER_TARGET;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct SessionThread {
    peer: SocketAddr,
    handle: JoinHandle<()>,
}

/// Session threads spawned by the accept loop.
#[derive(Default)]
pub(super) struct SessionTracker {
    threads: Mutex<Vec<SessionThread>>,
}

impl SessionTracker {
    pub(super) fn track(&self, peer: SocketAddr, handle: JoinHandle<()>) {
        let mut threads = self.lock();
        reap(&mut threads);
        threads.push(SessionThread { peer, handle });
    }

    /// Sessions that have not yet returned.
    pub(super) fn live(&self) -> usize {
        let mut threads = self.lock();
        reap(&mut threads);
        threads.len()
    }

    /// Waits for sessions to finish until `deadline` and returns how many are
    /// still running. Lingering threads are logged and left detached.
    pub(super) fn settle(&self, deadline: Instant) -> usize {
        loop {
            let live = self.live();
            if live == 0 || Instant::now() >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }
        let lingering: Vec<_> = std::mem::take(&mut *self.lock());
        for session in &lingering {
            warn!(
                target: LISTENER_TARGET,
                peer = %session.peer,
                "session still running after shutdown"
            );
        }
        lingering.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SessionThread>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn reap(threads: &mut Vec<SessionThread>) {
    let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(threads)
        .into_iter()
        .partition(|session| session.handle.is_finished());
    *threads = running;
    for session in finished {
        if session.handle.join().is_err() {
            warn!(
                target: LISTENER_TARGET,
                peer = %session.peer,
                "session thread panicked"
            );
        }
    }
}
