//! Multi-tick workflows driven from the owner thread.
//!
//! Some operations cannot finish within one owner-thread tick because they
//! depend on the host settling between steps. Each workflow is a chain of
//! scheduled callbacks that moves its own state from one phase to the next.
//! The owner thread never sleeps; waiting is expressed as a tick delay.

mod marker;
mod recording;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::handoff::{PendingResult, result_channel};
use crate::host::Host;
use crate::operations::{OperationResult, Params};
use crate::scheduler::OwnerScheduler;

pub use self::marker::{LocatorRequest, MarkerPhase, nearest_marker};
pub use self::recording::{
    AutomationState, FiringPoint, PollOutcome, RecordingAutomation, Section, SectionPlan,
};

pub(crate) const WORKFLOW_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::workflow");

/// Starts multi-tick workflows against one host.
pub struct WorkflowEngine {
    host: Arc<dyn Host>,
    scheduler: Arc<dyn OwnerScheduler>,
    recording: Arc<AtomicBool>,
}

impl WorkflowEngine {
    /// Creates an engine that schedules phases on `scheduler`.
    pub fn new(host: Arc<dyn Host>, scheduler: Arc<dyn OwnerScheduler>) -> Self {
        Self {
            host,
            scheduler,
            recording: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Begins locator creation and returns the channel its result arrives on.
    ///
    /// May be called from any thread. If a phase cannot be scheduled the
    /// channel closes without a result.
    #[must_use]
    pub fn create_locator(&self, request: LocatorRequest) -> PendingResult {
        let (sender, pending) = result_channel();
        marker::start(
            Arc::clone(&self.host),
            Arc::clone(&self.scheduler),
            request,
            sender,
        );
        pending
    }

    /// Validates a section plan and arms the recording automation.
    ///
    /// Must run on the owner thread. Returns the firing table while the poll
    /// loop keeps running on later ticks.
    ///
    /// # Errors
    ///
    /// Fails when the plan is invalid, an automation is already running, or
    /// the host rejects the initial transport changes.
    pub fn start_recording(&self, params: &Params) -> OperationResult {
        recording::start(
            Arc::clone(&self.host),
            Arc::clone(&self.scheduler),
            &self.recording,
            params,
        )
    }

    /// Whether a recording automation is between `ARMED` and `STOPPED`.
    #[must_use]
    pub fn recording_active(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}
