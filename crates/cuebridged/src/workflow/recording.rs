//! Scene-driven arrangement recording.
//!
//! A section plan says which scene should play from which bar. Once armed,
//! the automation polls the transport every tick and launches each scene
//! slightly before its section starts, because the host quantises launches to
//! the next bar. When the transport passes the end of the plan the automation
//! leaves record mode and stops rescheduling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::host::Host;
use crate::operations::{OperationError, OperationResult, Params};
use crate::scheduler::OwnerScheduler;

use super::WORKFLOW_TARGET;

const BEATS_PER_BAR: f64 = 4.0;
/// How far ahead of a section start its scene is launched, in beats.
pub const EARLY_FIRE_MARGIN: f64 = 2.0;
const AUTOMATION_NAME: &str = "arrangement recording";

/// One entry of a section plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub scene_index: usize,
    pub name: Option<String>,
    /// First bar of the section, counted from 1.
    pub bar: u32,
    /// Length in bars.
    pub bars: u32,
}

impl Section {
    fn start_beat(&self) -> f64 {
        f64::from(self.bar - 1) * BEATS_PER_BAR
    }

    fn end_beat(&self) -> f64 {
        self.start_beat() + f64::from(self.bars) * BEATS_PER_BAR
    }

    fn from_value(position: usize, value: &Value) -> Result<Self, OperationError> {
        let field = format!("sections[{position}]");
        let object = value
            .as_object()
            .ok_or_else(|| OperationError::invalid(&field, "expected an object"))?;
        let entry = Params::new(object.clone());
        let bar = positive(&field, "bar", entry.required_usize("bar")?)?;
        let bars = positive(&field, "bars", entry.required_usize("bars")?)?;
        let name = entry.str_or("name", "")?;
        Ok(Self {
            scene_index: entry.required_usize("scene_index")?,
            name: (!name.is_empty()).then(|| name.to_owned()),
            bar,
            bars,
        })
    }
}

fn positive(field: &str, name: &str, value: usize) -> Result<u32, OperationError> {
    u32::try_from(value)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| OperationError::invalid(format!("{field}.{name}"), "must be at least 1"))
}

/// Ordered list of sections to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    sections: Vec<Section>,
}

impl SectionPlan {
    /// Builds a plan from explicit sections.
    ///
    /// # Errors
    ///
    /// Fails when `sections` is empty.
    pub fn new(sections: Vec<Section>) -> Result<Self, OperationError> {
        if sections.is_empty() {
            return Err(OperationError::invalid("sections", "must not be empty"));
        }
        Ok(Self { sections })
    }

    /// Reads the `sections` array of a command.
    ///
    /// # Errors
    ///
    /// Fails when the array is missing, empty, or holds a malformed section.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        let sections = params
            .required_array("sections")?
            .iter()
            .enumerate()
            .map(|(position, value)| Section::from_value(position, value))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(sections)
    }

    /// Beat at which the last section ends.
    #[must_use]
    pub fn total_beats(&self) -> f64 {
        self.sections
            .iter()
            .map(Section::end_beat)
            .fold(0.0, f64::max)
    }

    /// Firing table sorted by beat; sections starting together keep plan
    /// order. Unnamed sections take the scene's name.
    ///
    /// # Errors
    ///
    /// Fails when a section refers to a scene that does not exist.
    pub fn firing_points(
        &self,
        scene_names: &[String],
    ) -> Result<Vec<FiringPoint>, OperationError> {
        let mut points = self
            .sections
            .iter()
            .map(|section| {
                let scene = scene_names
                    .get(section.scene_index)
                    .ok_or_else(|| OperationError::out_of_range("scene", section.scene_index))?;
                Ok(FiringPoint {
                    beat: section.start_beat(),
                    index: section.scene_index,
                    name: section.name.clone().unwrap_or_else(|| scene.clone()),
                })
            })
            .collect::<Result<Vec<_>, OperationError>>()?;
        points.sort_by(|left, right| left.beat.total_cmp(&right.beat));
        Ok(points)
    }
}

/// A scene launch scheduled at a beat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiringPoint {
    pub beat: f64,
    /// Scene to launch.
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationState {
    Armed,
    Polling,
    Stopped,
}

/// Scenes to launch on this tick and whether the automation is done.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollOutcome {
    pub fire: Vec<FiringPoint>,
    pub finished: bool,
}

/// Decision logic of the recording automation, free of any host access.
#[derive(Debug, Clone)]
pub struct RecordingAutomation {
    points: Vec<FiringPoint>,
    next_index: usize,
    total_beats: f64,
    stop_after: bool,
    state: AutomationState,
}

impl RecordingAutomation {
    /// Arms an automation over a sorted firing table.
    #[must_use]
    pub fn new(points: Vec<FiringPoint>, total_beats: f64, stop_after: bool) -> Self {
        Self {
            points,
            next_index: 0,
            total_beats,
            stop_after,
            state: AutomationState::Armed,
        }
    }

    #[must_use]
    pub fn state(&self) -> AutomationState {
        self.state
    }

    #[must_use]
    pub fn stop_after(&self) -> bool {
        self.stop_after
    }

    /// Beat of the earliest firing point.
    #[must_use]
    pub fn first_beat(&self) -> f64 {
        self.points.first().map_or(0.0, |point| point.beat)
    }

    /// Stops the automation without reaching the end of the plan.
    pub fn cancel(&mut self) {
        self.state = AutomationState::Stopped;
    }

    /// Advances the automation to the transport `position`.
    ///
    /// Every pending point whose beat is within [`EARLY_FIRE_MARGIN`] of the
    /// position fires, in table order. Once the position reaches the end of
    /// the plan the automation stops and later polls do nothing.
    pub fn poll(&mut self, position: f64) -> PollOutcome {
        if self.state == AutomationState::Stopped {
            return PollOutcome {
                fire: Vec::new(),
                finished: true,
            };
        }
        self.state = AutomationState::Polling;
        let mut fire = Vec::new();
        while let Some(point) = self.points.get(self.next_index) {
            if point.beat > position + EARLY_FIRE_MARGIN {
                break;
            }
            fire.push(point.clone());
            self.next_index += 1;
        }
        let finished = position >= self.total_beats;
        if finished {
            self.state = AutomationState::Stopped;
        }
        PollOutcome { fire, finished }
    }
}

/// Single-flight guard; releases the slot when dropped.
struct ActiveSlot {
    flag: Arc<AtomicBool>,
}

impl ActiveSlot {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct RecordingDriver {
    host: Arc<dyn Host>,
    scheduler: Arc<dyn OwnerScheduler>,
    automation: RecordingAutomation,
    _slot: ActiveSlot,
}

pub(super) fn start(
    host: Arc<dyn Host>,
    scheduler: Arc<dyn OwnerScheduler>,
    active: &Arc<AtomicBool>,
    params: &Params,
) -> OperationResult {
    let plan = SectionPlan::from_params(params)?;
    let stop_after = params.bool_or("stop_after", true)?;
    let points = plan.firing_points(&host.scene_names())?;
    let total_beats = plan.total_beats();
    let slot = ActiveSlot::acquire(active).ok_or(OperationError::Busy {
        operation: AUTOMATION_NAME,
    })?;

    let automation = RecordingAutomation::new(points.clone(), total_beats, stop_after);
    host.set_current_time(automation.first_beat())?;
    host.set_record_mode(true)?;
    if !host.is_playing()
        && let Err(error) = host.start_playing()
    {
        leave_record_mode(host.as_ref());
        return Err(error.into());
    }

    let driver = RecordingDriver {
        host: Arc::clone(&host),
        scheduler,
        automation,
        _slot: slot,
    };
    if !driver.reschedule() {
        leave_record_mode(host.as_ref());
        stop_transport(host.as_ref());
        return Err(OperationError::internal(
            "owner thread refused the recording automation",
        ));
    }
    info!(
        target: WORKFLOW_TARGET,
        sections = points.len(),
        total_beats,
        stop_after,
        "arrangement recording armed"
    );
    Ok(json!({
        "firing_points": points,
        "total_beats": total_beats,
        "stop_after": stop_after,
    }))
}

impl RecordingDriver {
    /// Queues the next poll. Returns `false` when the scheduler refused it, in
    /// which case the driver and its slot are gone.
    fn reschedule(self) -> bool {
        let scheduler = Arc::clone(&self.scheduler);
        match scheduler.schedule(1, Box::new(move || self.tick())) {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    target: WORKFLOW_TARGET,
                    %error,
                    "recording automation could not reschedule"
                );
                false
            }
        }
    }

    fn tick(mut self) {
        let position = self.host.current_time();
        if !self.host.is_playing() || !self.host.record_mode() {
            self.interrupt(position);
            return;
        }
        let outcome = self.automation.poll(position);
        for point in &outcome.fire {
            match self.host.fire_scene(point.index) {
                Ok(()) => info!(
                    target: WORKFLOW_TARGET,
                    scene = point.index,
                    name = %point.name,
                    beat = point.beat,
                    position,
                    "launched section scene"
                ),
                Err(error) => warn!(
                    target: WORKFLOW_TARGET,
                    scene = point.index,
                    %error,
                    "failed to launch section scene"
                ),
            }
        }
        if outcome.finished {
            self.finish(position);
        } else {
            self.reschedule();
        }
    }

    /// Ends the run without launching anything further after the transport
    /// was stopped or record mode was left by someone else.
    fn interrupt(mut self, position: f64) {
        self.automation.cancel();
        if self.host.record_mode() {
            leave_record_mode(self.host.as_ref());
        }
        info!(
            target: WORKFLOW_TARGET,
            position,
            playing = self.host.is_playing(),
            "arrangement recording interrupted"
        );
    }

    fn finish(self, position: f64) {
        leave_record_mode(self.host.as_ref());
        if self.automation.stop_after() {
            stop_transport(self.host.as_ref());
        }
        debug!(
            target: WORKFLOW_TARGET,
            state = ?self.automation.state(),
            "recording automation finished"
        );
        info!(
            target: WORKFLOW_TARGET,
            position,
            "arrangement recording stopped"
        );
    }
}

fn leave_record_mode(host: &dyn Host) {
    if let Err(error) = host.set_record_mode(false) {
        warn!(target: WORKFLOW_TARGET, %error, "failed to leave record mode");
    }
}

fn stop_transport(host: &dyn Host) {
    if host.is_playing()
        && let Err(error) = host.stop_playing()
    {
        warn!(target: WORKFLOW_TARGET, %error, "failed to stop transport");
    }
}
