//! Cross-thread task handoff.
//!
//! A session thread wraps mutating work in a closure and submits it to the
//! owner thread. The owner-side wrapper runs the work, contains any panic, and
//! sends exactly one result into a capacity-1 channel. The session thread waits
//! on that channel with a deadline. If the deadline elapses first the caller
//! gives up; the work is not revoked and still runs later, and its result is
//! dropped when the send finds the receiver gone.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::operations::{OperationError, OperationResult};
use crate::scheduler::{OwnerScheduler, ScheduleError};

pub(crate) const HANDOFF_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handoff");

/// Reasons a caller stopped waiting without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The deadline passed before the owner thread answered.
    #[error("no result within {waited:?}")]
    Timeout { waited: Duration },
    /// The producing side was dropped without sending.
    #[error("result channel closed without a result")]
    Disconnected,
}

/// Owner-side half of a result channel. Consumed by [`ResultSender::send`].
#[derive(Debug)]
pub struct ResultSender {
    inner: SyncSender<OperationResult>,
}

impl ResultSender {
    /// Delivers the result. A caller that already timed out is not an error.
    pub fn send(self, result: OperationResult) {
        if self.inner.try_send(result).is_err() {
            debug!(
                target: HANDOFF_TARGET,
                "caller stopped waiting; discarding owner-thread result"
            );
        }
    }
}

/// Caller-side half of a result channel.
#[derive(Debug)]
pub struct PendingResult {
    inner: Receiver<OperationResult>,
}

impl PendingResult {
    /// Blocks until the result arrives or `deadline` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError`] when no result was delivered in time.
    pub fn wait(self, deadline: Duration) -> Result<OperationResult, WaitError> {
        self.inner.recv_timeout(deadline).map_err(|error| match error {
            RecvTimeoutError::Timeout => WaitError::Timeout { waited: deadline },
            RecvTimeoutError::Disconnected => WaitError::Disconnected,
        })
    }
}

/// Creates a single-slot rendezvous between one producer and one waiter.
#[must_use]
pub fn result_channel() -> (ResultSender, PendingResult) {
    let (sender, receiver) = mpsc::sync_channel(1);
    (
        ResultSender { inner: sender },
        PendingResult { inner: receiver },
    )
}

/// Submits work to the owner thread.
#[derive(Clone)]
pub struct TaskHandoff {
    scheduler: Arc<dyn OwnerScheduler>,
}

impl TaskHandoff {
    /// Wraps the scheduler that owns host mutation.
    pub fn new(scheduler: Arc<dyn OwnerScheduler>) -> Self {
        Self { scheduler }
    }

    /// Queues `work` for the next owner-thread tick and returns its result
    /// channel.
    ///
    /// When the scheduler rejects the submission the work runs inline on the
    /// calling thread. When the scheduler has shut down the work is dropped
    /// and the returned channel reports [`WaitError::Disconnected`].
    pub fn submit<F>(&self, work: F) -> PendingResult
    where
        F: FnOnce() -> OperationResult + Send + 'static,
    {
        let (sender, pending) = result_channel();
        let callback = Box::new(move || sender.send(run_guarded(work)));
        match self.scheduler.schedule(0, callback) {
            Ok(()) => {}
            Err(ScheduleError::Rejected(callback)) => {
                debug!(
                    target: HANDOFF_TARGET,
                    "scheduler rejected submission; running inline"
                );
                callback();
            }
            Err(ScheduleError::Closed(_)) => {
                warn!(
                    target: HANDOFF_TARGET,
                    "owner thread is not accepting work"
                );
            }
        }
        pending
    }
}

/// Runs `work`, converting a panic into an internal error.
pub(crate) fn run_guarded<F>(work: F) -> OperationResult
where
    F: FnOnce() -> OperationResult,
{
    panic::catch_unwind(AssertUnwindSafe(work))
        .unwrap_or_else(|payload| Err(OperationError::internal(panic_message(&*payload))))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || "handler panicked".to_owned(),
            |message| format!("handler panicked: {message}"),
        )
}
