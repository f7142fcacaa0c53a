//! Behavioural tests for the bridge bootstrap sequence.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::bootstrap::{BootstrapError, Bridge, ConfigLoader, RunningBridge, bootstrap_with};
use crate::host::MemoryHost;
use crate::scheduler::TickLoop;

use super::support::{
    FailingConfigLoader, HealthEvent, RecordingHealthReporter, StepResult, TestConfigLoader,
};

struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    reporter: Arc<RecordingHealthReporter>,
    bridge: Option<Bridge>,
    error: Option<BootstrapError>,
    owner: Option<Arc<TickLoop>>,
    running: Option<RunningBridge>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            bridge: None,
            error: None,
            owner: None,
            running: None,
        }
    }

    fn bootstrap(&mut self) {
        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(bridge) => self.bridge = Some(bridge),
            Err(error) => self.error = Some(error),
        }
    }

    fn serve(&mut self) -> StepResult {
        let bridge = self.bridge.as_ref().ok_or("bridge was not bootstrapped")?;
        let owner = Arc::new(
            TickLoop::spawn(Duration::from_millis(5)).map_err(|error| error.to_string())?,
        );
        let running = bridge
            .serve(Arc::new(MemoryHost::new()), owner.clone())
            .map_err(|error| error.to_string())?;
        self.owner = Some(owner);
        self.running = Some(running);
        Ok(())
    }
}

impl Drop for BootstrapWorld {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown();
        }
        if let Some(owner) = self.owner.take() {
            owner.shutdown();
        }
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(TestConfigLoader::new());
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(FailingConfigLoader);
}

#[when("the bridge bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().bootstrap();
}

#[when("the bridge starts serving")]
fn when_bridge_serves(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow_mut().serve()
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    assert!(world.error.is_none(), "bootstrap error: {:?}", world.error);
    assert!(world.bridge.is_some(), "bridge should have been built");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.error, Some(BootstrapError::Configuration { .. })),
        "expected a configuration error, got {:?}",
        world.error
    );
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events.contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing: {events:?}"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events.contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing: {events:?}"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[then("the reporter recorded the listener address")]
fn then_reporter_listener(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let address = world
        .running
        .as_ref()
        .expect("bridge should be running")
        .local_addr();
    assert_ne!(address.port(), 0, "ephemeral port should be resolved");
    assert!(
        world
            .reporter
            .events()
            .contains(&HealthEvent::ListenerReady(address)),
        "listener ready event missing"
    );
}

#[scenario(path = "tests/features/bridge_bootstrap.feature")]
fn bridge_bootstrap(#[from(world)] world: RefCell<BootstrapWorld>) {
    drop(world);
}
