//! Built-in domain operations.
//!
//! Each operation is a plain function over the [`Host`] and the request's
//! [`Params`]. The bridge only invokes them and reports their errors; it never
//! depends on what they do. Operations are split by how the router must run
//! them: read-only handlers run on the session thread, mutating handlers run on
//! the owner thread via the task handoff.

mod errors;
mod locators;
mod params;
mod scenes;
mod song;

use serde_json::Value;

use crate::host::Host;

pub use self::errors::OperationError;
pub use self::locators::{get_locator_names, jump_to_locator};
pub use self::params::Params;

/// Outcome of a single operation.
pub type OperationResult = Result<Value, OperationError>;

/// Signature shared by every built-in operation.
pub type Operation = fn(&dyn Host, &Params) -> OperationResult;

const READ_ONLY: &[(&str, Operation)] = &[
    ("get_session_info", song::get_session_info),
    ("get_recording_status", song::get_recording_status),
    ("get_locators", locators::get_locators),
    ("get_scenes", scenes::get_scenes),
];

const MUTATING: &[(&str, Operation)] = &[
    ("set_tempo", song::set_tempo),
    ("start_playback", song::start_playback),
    ("stop_playback", song::stop_playback),
    ("set_playback_position", song::set_playback_position),
    ("trigger_scene", scenes::trigger_scene),
    ("set_scene_name", scenes::set_scene_name),
    ("start_arrangement_recording", song::start_arrangement_recording),
    ("stop_arrangement_recording", song::stop_arrangement_recording),
];

/// Looks up a handler that is safe to call off the owner thread.
#[must_use]
pub fn read_only(name: &str) -> Option<Operation> {
    find(READ_ONLY, name)
}

/// Looks up a handler that must run on the owner thread.
#[must_use]
pub fn mutating(name: &str) -> Option<Operation> {
    find(MUTATING, name)
}

/// Names of every static operation, read-only first.
pub fn names() -> impl Iterator<Item = &'static str> {
    READ_ONLY.iter().chain(MUTATING).map(|(name, _)| *name)
}

fn find(table: &[(&str, Operation)], name: &str) -> Option<Operation> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, operation)| *operation)
}
