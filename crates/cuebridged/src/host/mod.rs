//! Boundary to the host application's live object graph.
//!
//! The bridge never reaches into host internals directly. Everything it needs
//! is expressed by [`Host`], whose mutating methods must only be invoked from
//! the owner thread. Reads are assumed safe from any thread, mirroring what the
//! host itself promises; they may observe a state mid-mutation.

mod errors;
mod memory;

use serde::Serialize;

pub use errors::HostError;
pub use memory::MemoryHost;

/// A named position on the arrangement timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Position in beats.
    pub time: f64,
    /// Display name; empty when unnamed.
    pub name: String,
}

impl Marker {
    /// Builds a marker.
    #[must_use]
    pub fn new(time: f64, name: impl Into<String>) -> Self {
        Self {
            time,
            name: name.into(),
        }
    }
}

/// Live object graph exposed by the host application.
pub trait Host: Send + Sync {
    /// Whether the transport is running.
    fn is_playing(&self) -> bool;

    /// Starts the transport.
    fn start_playing(&self) -> Result<(), HostError>;

    /// Stops the transport.
    fn stop_playing(&self) -> Result<(), HostError>;

    /// Current transport position in beats.
    fn current_time(&self) -> f64;

    /// Moves the position cursor.
    fn set_current_time(&self, beats: f64) -> Result<(), HostError>;

    /// Song tempo in beats per minute.
    fn tempo(&self) -> f64;

    /// Changes the song tempo.
    fn set_tempo(&self, bpm: f64) -> Result<(), HostError>;

    /// Whether arrangement record mode is enabled.
    fn record_mode(&self) -> bool;

    /// Enables or disables arrangement record mode.
    fn set_record_mode(&self, enabled: bool) -> Result<(), HostError>;

    /// Creates a marker at the cursor, or removes the one already there.
    fn toggle_marker_at_cursor(&self) -> Result<(), HostError>;

    /// All markers in host iteration order.
    fn markers(&self) -> Vec<Marker>;

    /// Renames the marker at `index` in [`Host::markers`] order.
    fn rename_marker(&self, index: usize, name: &str) -> Result<(), HostError>;

    /// Scene names in session order.
    fn scene_names(&self) -> Vec<String>;

    /// Launches the scene at `index`.
    fn fire_scene(&self, index: usize) -> Result<(), HostError>;

    /// Renames the scene at `index`.
    fn rename_scene(&self, index: usize, name: &str) -> Result<(), HostError>;
}
