//! Bundled owner thread driven by a fixed tick period.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::queue::TickQueue;
use super::{Callback, OwnerScheduler, SCHEDULER_TARGET, ScheduleError, run_callback};

const OWNER_THREAD_NAME: &str = "cuebridge-owner";

/// Host hook invoked on the owner thread at the start of every tick with the
/// wall time elapsed since the previous tick.
pub type TickHook = Box<dyn FnMut(Duration) + Send + 'static>;

struct Shared {
    queue: Mutex<TickQueue>,
    running: AtomicBool,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, TickQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner thread that drains due callbacks once per tick.
///
/// Callbacks still queued when the loop stops are dropped without running.
pub struct TickLoop {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TickLoop {
    /// Spawns an owner thread with no per-tick host work.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be spawned.
    pub fn spawn(interval: Duration) -> io::Result<Self> {
        Self::spawn_with_hook(interval, Box::new(|_| {}))
    }

    /// Spawns an owner thread that runs `hook` before each batch of callbacks.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be spawned.
    pub fn spawn_with_hook(interval: Duration, hook: TickHook) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(TickQueue::default()),
            running: AtomicBool::new(true),
        });
        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(OWNER_THREAD_NAME.to_owned())
            .spawn(move || run_ticks(&loop_shared, interval, hook))?;
        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Number of callbacks waiting for a future tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue().len()
    }

    /// Whether the owner thread still accepts callbacks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Stops the loop and waits for the current tick to finish.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if thread::current().id() == handle.thread().id() {
                return;
            }
            if handle.join().is_err() {
                warn!(target: SCHEDULER_TARGET, "owner thread panicked");
            }
        }
        let dropped = std::mem::take(&mut *self.shared.queue()).len();
        if dropped > 0 {
            debug!(
                target: SCHEDULER_TARGET,
                dropped,
                "discarded callbacks queued after shutdown"
            );
        }
    }
}

impl OwnerScheduler for TickLoop {
    fn schedule(&self, delay_ticks: u32, callback: Callback) -> Result<(), ScheduleError> {
        if !self.is_running() {
            return Err(ScheduleError::Closed(callback));
        }
        self.shared.queue().push(delay_ticks, callback);
        Ok(())
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

fn run_ticks(shared: &Shared, interval: Duration, mut hook: TickHook) {
    debug!(
        target: SCHEDULER_TARGET,
        interval_ms = interval.as_millis(),
        "owner thread started"
    );
    let mut last_tick = Instant::now();
    while shared.running.load(Ordering::SeqCst) {
        thread::sleep(interval);
        let now = Instant::now();
        let elapsed = now.duration_since(last_tick);
        last_tick = now;
        if panic::catch_unwind(AssertUnwindSafe(|| hook(elapsed))).is_err() {
            warn!(target: SCHEDULER_TARGET, "tick hook panicked");
        }
        let due = shared.queue().begin_tick();
        for callback in due {
            run_callback(callback);
        }
    }
    debug!(target: SCHEDULER_TARGET, "owner thread stopped");
}
