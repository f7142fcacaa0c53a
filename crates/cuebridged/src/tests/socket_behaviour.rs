//! Behavioural tests for the bridge socket listener.

use std::cell::RefCell;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use cuebridge_config::ListenEndpoint;

use crate::transport::{
    ConnectionHandler, CountingHandler, HoldingHandler, ListenerHandle, SocketListener,
};

use super::support::{HealthEvent, RecordingHealthReporter, StepResult};

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

struct ListenerWorld {
    endpoint: ListenEndpoint,
    reporter: Arc<RecordingHealthReporter>,
    listener: Option<ListenerHandle>,
    accepted: Arc<AtomicUsize>,
    release: Option<Arc<AtomicBool>>,
    address: Option<SocketAddr>,
    bind_error: Option<String>,
    reserved: Option<TcpListener>,
    clients: Vec<TcpStream>,
    lingering: Option<usize>,
}

impl ListenerWorld {
    fn new() -> Self {
        Self {
            endpoint: ListenEndpoint::new("127.0.0.1", 0),
            reporter: Arc::new(RecordingHealthReporter::default()),
            listener: None,
            accepted: Arc::new(AtomicUsize::new(0)),
            release: None,
            address: None,
            bind_error: None,
            reserved: None,
            clients: Vec::new(),
            lingering: None,
        }
    }

    fn start_counting(&mut self) {
        let (count, handler) = CountingHandler::new();
        self.accepted = count;
        self.start_with(handler);
    }

    fn start_holding(&mut self) {
        let (release, handler) = HoldingHandler::new(false);
        self.release = Some(release);
        self.start_with(handler);
    }

    fn start_with(&mut self, handler: Arc<dyn ConnectionHandler>) {
        let started = SocketListener::bind(&self.endpoint).and_then(|listener| {
            self.address = Some(listener.local_addr());
            listener.start(handler, self.reporter.clone())
        });
        match started {
            Ok(handle) => self.listener = Some(handle),
            Err(error) => self.bind_error = Some(error.to_string()),
        }
    }

    fn reserve_port(&mut self) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind reserved port");
        let port = listener.local_addr().expect("local addr").port();
        self.endpoint = ListenEndpoint::new("127.0.0.1", port);
        self.reserved = Some(listener);
    }

    fn connect_clients(&mut self, count: usize) {
        let addr = self.address.expect("listener address should be set");
        for _ in 0..count {
            self.clients
                .push(TcpStream::connect(addr).expect("connect client"));
        }
    }

    fn wait_until(&self, condition: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if condition(self) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn shut_down(&mut self) -> StepResult {
        let handle = self.listener.take().ok_or("listener is not running")?;
        if !self.wait_until(|_| handle.live_sessions() > 0) {
            return Err("no session started before shutdown".to_owned());
        }
        let report = handle
            .join(Duration::from_millis(100))
            .map_err(|error| error.to_string())?;
        self.lingering = Some(report.lingering);
        Ok(())
    }
}

impl Drop for ListenerWorld {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release.store(true, Ordering::SeqCst);
        }
        if let Some(handle) = self.listener.take() {
            let _ = handle.join(WAIT_TIMEOUT);
        }
        self.reserved = None;
    }
}

#[fixture]
fn world() -> RefCell<ListenerWorld> {
    RefCell::new(ListenerWorld::new())
}

#[given("a TCP socket listener is running")]
fn given_tcp_listener(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_counting();
    assert!(
        world.borrow().bind_error.is_none(),
        "listener start failed: {:?}",
        world.borrow().bind_error
    );
}

#[given("a TCP socket listener with sessions that ignore shutdown")]
fn given_holding_listener(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_holding();
    assert!(
        world.borrow().bind_error.is_none(),
        "listener start failed: {:?}",
        world.borrow().bind_error
    );
}

#[given("a TCP socket is already bound")]
fn given_tcp_in_use(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().reserve_port();
}

#[when("a client connects")]
fn when_client_connects(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().connect_clients(1);
}

#[when("two clients connect")]
fn when_two_clients_connect(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().connect_clients(2);
}

#[when("the listener starts on the same socket")]
fn when_listener_starts_same_socket(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_counting();
}

#[when("the listener shuts down")]
fn when_listener_shuts_down(world: &RefCell<ListenerWorld>) -> StepResult {
    world.borrow_mut().shut_down()
}

#[then("the listener records {count} connections")]
fn then_listener_records(world: &RefCell<ListenerWorld>, count: usize) {
    let world = world.borrow();
    assert!(
        world.wait_until(|world| world.accepted.load(Ordering::SeqCst) >= count),
        "expected {count} connections, got {}",
        world.accepted.load(Ordering::SeqCst)
    );
}

#[then("the reporter recorded {count} session openings")]
fn then_sessions_opened(world: &RefCell<ListenerWorld>, count: usize) {
    let world = world.borrow();
    assert!(
        world.wait_until(|world| world.reporter.count(&HealthEvent::SessionOpened) == count),
        "session events: {:?}",
        world.reporter.events()
    );
}

#[then("starting the listener fails")]
fn then_listener_fails(world: &RefCell<ListenerWorld>) {
    assert!(
        world.borrow().bind_error.is_some(),
        "expected listener start to fail"
    );
}

#[then("shutdown reports {count} lingering session")]
fn then_lingering(world: &RefCell<ListenerWorld>, count: usize) {
    let world = world.borrow();
    assert_eq!(world.lingering, Some(count));
    assert!(
        world
            .reporter
            .events()
            .contains(&HealthEvent::ShutdownCompleted { lingering: count }),
        "shutdown event missing: {:?}",
        world.reporter.events()
    );
}

#[scenario(path = "tests/features/bridge_socket.feature")]
fn bridge_socket_listener(#[from(world)] world: RefCell<ListenerWorld>) {
    drop(world);
}
