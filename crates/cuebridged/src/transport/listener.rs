//! TCP listener and its background accept loop.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use cuebridge_config::ListenEndpoint;

use super::sessions::SessionTracker;
use super::{ConnectionHandler, LISTENER_TARGET, ListenerError, SessionContext};
use crate::health::HealthReporter;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const JOIN_POLL: Duration = Duration::from_millis(10);

/// Listener bound to a TCP endpoint but not yet accepting.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: ListenEndpoint,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &ListenEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_tcp(&endpoint.host, endpoint.port)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
            local_addr,
        })
    }

    /// Address actually bound; differs from the endpoint when port 0 was used.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let sessions = Arc::new(SessionTracker::default());
        let local_addr = self.local_addr();
        let accept = AcceptLoop {
            listener: self,
            shutdown: Arc::clone(&shutdown),
            sessions: Arc::clone(&sessions),
            handler,
            reporter: Arc::clone(&reporter),
        };
        let handle = thread::Builder::new()
            .name("cuebridge-accept".to_owned())
            .spawn(move || accept.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        reporter.listener_ready(local_addr);
        Ok(ListenerHandle {
            shutdown,
            sessions,
            reporter,
            local_addr,
            handle: Some(handle),
        })
    }
}

/// Outcome of a bounded listener shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShutdownReport {
    /// Sessions still running when the budget ran out.
    pub(crate) lingering: usize,
}

/// Handle to the background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    sessions: Arc<SessionTracker>,
    reporter: Arc<dyn HealthReporter>,
    local_addr: SocketAddr,
    handle: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sessions currently being served.
    pub(crate) fn live_sessions(&self) -> usize {
        self.sessions.live()
    }

    /// Asks the accept loop and every session to stop.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Stops accepting and waits up to `timeout` for the accept loop and the
    /// sessions it spawned. Sessions still running afterwards are left
    /// detached and counted in the report.
    pub(crate) fn join(mut self, timeout: Duration) -> Result<ShutdownReport, ListenerError> {
        self.shutdown();
        let deadline = Instant::now() + timeout;
        if let Some(handle) = self.handle.take() {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    warn!(
                        target: LISTENER_TARGET,
                        ?timeout,
                        "accept loop did not stop in time"
                    );
                    return Err(ListenerError::JoinTimeout { timeout });
                }
                thread::sleep(JOIN_POLL);
            }
            handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        }
        let lingering = self.sessions.settle(deadline);
        self.reporter.shutdown_completed(lingering);
        Ok(ShutdownReport { lingering })
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

struct AcceptLoop {
    listener: SocketListener,
    shutdown: Arc<AtomicBool>,
    sessions: Arc<SessionTracker>,
    handler: Arc<dyn ConnectionHandler>,
    reporter: Arc<dyn HealthReporter>,
}

impl AcceptLoop {
    fn run(self) {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.endpoint,
            address = %self.listener.local_addr(),
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.load(Ordering::SeqCst) {
            match accept_connection(&self.listener.listener) {
                Ok(Some((stream, peer))) => {
                    last_error = None;
                    self.spawn_session(stream, peer);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: LISTENER_TARGET,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        info!(target: LISTENER_TARGET, "socket listener stopped");
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let context = SessionContext::new(peer, Arc::clone(&self.shutdown));
        let handler = Arc::clone(&self.handler);
        let reporter = Arc::clone(&self.reporter);
        reporter.session_opened(peer);
        let spawned = thread::Builder::new()
            .name(format!("cuebridge-session-{peer}"))
            .spawn(move || {
                handler.handle(stream, context);
                reporter.session_closed(peer);
            });
        match spawned {
            Ok(handle) => self.sessions.track(peer, handle),
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    %peer,
                    error = %error,
                    "failed to spawn session thread"
                );
                self.reporter.session_closed(peer);
            }
        }
    }
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
