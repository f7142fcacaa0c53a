//! Locator creation.
//!
//! The host only offers "toggle a marker at the cursor", so creating a named
//! locator takes three owner-thread phases: move the cursor, toggle, then find
//! the marker that landed nearest the requested time and name it.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::handoff::ResultSender;
use crate::host::{Host, HostError, Marker};
use crate::operations::{OperationError, Params};
use crate::scheduler::OwnerScheduler;

use super::WORKFLOW_TARGET;

const POSITION_DELAY: u32 = 1;
const TOGGLE_DELAY: u32 = 2;
const RESOLVE_DELAY: u32 = 2;
const NOT_FOUND_WARNING: &str = "locator not found";

/// Parameters of a `create_locator` command.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorRequest {
    /// Requested time in beats. The cursor move clamps it at zero; the marker
    /// search and the reply use it as given.
    pub position: f64,
    /// Name to apply, if any.
    pub name: Option<String>,
}

impl LocatorRequest {
    /// Reads `position` (default 0) and `name` (default: leave unnamed).
    ///
    /// # Errors
    ///
    /// Fails when either parameter has the wrong type.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        let position = params.f64_or("position", 0.0)?;
        let name = params.str_or("name", "")?;
        Ok(Self {
            position,
            name: (!name.is_empty()).then(|| name.to_owned()),
        })
    }
}

/// Progress of one locator creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPhase {
    Start,
    Positioned,
    Marked,
    Resolved,
    Failed,
}

/// Finds the marker closest to `target`.
///
/// Only a strictly smaller distance replaces the current best, so on a tie the
/// marker seen first wins.
#[must_use]
pub fn nearest_marker(markers: &[Marker], target: f64) -> Option<(usize, &Marker)> {
    let mut best: Option<(usize, &Marker, f64)> = None;
    for (index, marker) in markers.iter().enumerate() {
        let delta = (marker.time - target).abs();
        if best.is_none_or(|(_, _, best_delta)| delta < best_delta) {
            best = Some((index, marker, delta));
        }
    }
    best.map(|(index, marker, _)| (index, marker))
}

struct MarkerJob {
    host: Arc<dyn Host>,
    scheduler: Arc<dyn OwnerScheduler>,
    request: LocatorRequest,
    phase: MarkerPhase,
    sender: ResultSender,
}

pub(super) fn start(
    host: Arc<dyn Host>,
    scheduler: Arc<dyn OwnerScheduler>,
    request: LocatorRequest,
    sender: ResultSender,
) {
    let job = MarkerJob {
        host,
        scheduler,
        request,
        phase: MarkerPhase::Start,
        sender,
    };
    job.advance(POSITION_DELAY, MarkerJob::position);
}

impl MarkerJob {
    fn advance(self, delay: u32, next: fn(Self)) {
        let scheduler = Arc::clone(&self.scheduler);
        let phase = self.phase;
        if let Err(error) = scheduler.schedule(delay, Box::new(move || next(self))) {
            // The job, and with it the sender, is dropped here; the waiter sees
            // a closed channel.
            warn!(
                target: WORKFLOW_TARGET,
                ?phase,
                %error,
                "locator workflow could not schedule its next phase"
            );
        }
    }

    fn enter(&mut self, phase: MarkerPhase) {
        debug!(
            target: WORKFLOW_TARGET,
            from = ?self.phase,
            to = ?phase,
            position = self.request.position,
            "locator workflow phase"
        );
        self.phase = phase;
    }

    fn position(mut self) {
        let outcome = (|| -> Result<(), HostError> {
            if self.host.is_playing() {
                self.host.stop_playing()?;
            }
            self.host.set_current_time(self.request.position.max(0.0))
        })();
        match outcome {
            Ok(()) => {
                self.enter(MarkerPhase::Positioned);
                self.advance(TOGGLE_DELAY, Self::mark);
            }
            Err(error) => self.fail(error),
        }
    }

    fn mark(mut self) {
        match self.host.toggle_marker_at_cursor() {
            Ok(()) => {
                self.enter(MarkerPhase::Marked);
                self.advance(RESOLVE_DELAY, Self::resolve);
            }
            Err(error) => self.fail(error),
        }
    }

    fn resolve(mut self) {
        let markers = self.host.markers();
        let result = match nearest_marker(&markers, self.request.position) {
            Some((index, marker)) => {
                let mut name = marker.name.clone();
                if let Some(requested) = &self.request.name {
                    match self.host.rename_marker(index, requested) {
                        Ok(()) => requested.clone_into(&mut name),
                        Err(error) => warn!(
                            target: WORKFLOW_TARGET,
                            index,
                            %error,
                            "failed to rename locator"
                        ),
                    }
                }
                json!({ "position": marker.time, "name": name })
            }
            None => json!({
                "position": self.request.position,
                "name": self.request.name.clone().unwrap_or_default(),
                "warning": NOT_FOUND_WARNING,
            }),
        };
        self.enter(MarkerPhase::Resolved);
        self.sender.send(Ok(result));
    }

    fn fail(mut self, error: HostError) {
        self.enter(MarkerPhase::Failed);
        warn!(
            target: WORKFLOW_TARGET,
            %error,
            "locator workflow failed"
        );
        self.sender.send(Err(error.into()));
    }
}
