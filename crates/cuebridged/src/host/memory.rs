//! In-process host used by the offline daemon and by tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Host, HostError, Marker};

const MIN_TEMPO: f64 = 20.0;
const MAX_TEMPO: f64 = 999.0;
const DEFAULT_TEMPO: f64 = 120.0;
const CURSOR_EPSILON: f64 = 1e-6;

#[derive(Debug)]
struct MemoryState {
    playing: bool,
    time: f64,
    tempo: f64,
    record_mode: bool,
    markers: Vec<Marker>,
    scenes: Vec<String>,
    fired_scenes: Vec<usize>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            playing: false,
            time: 0.0,
            tempo: DEFAULT_TEMPO,
            record_mode: false,
            markers: Vec::new(),
            scenes: Vec::new(),
            fired_scenes: Vec::new(),
        }
    }
}

/// Thread-safe in-memory song model.
///
/// The transport only moves when [`MemoryHost::advance`] is called, which the
/// bundled owner loop does once per tick.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    /// Creates an empty song at 120 BPM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a song with the given scene names.
    #[must_use]
    pub fn with_scenes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let host = Self::new();
        host.lock().scenes = names.into_iter().map(Into::into).collect();
        host
    }

    /// Inserts a marker directly, bypassing the cursor.
    pub fn add_marker(&self, time: f64, name: impl Into<String>) {
        self.lock().markers.push(Marker::new(time, name));
    }

    /// Scenes fired so far, in firing order.
    #[must_use]
    pub fn fired_scenes(&self) -> Vec<usize> {
        self.lock().fired_scenes.clone()
    }

    /// Moves the transport forward by `elapsed` wall time when playing.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.lock();
        if state.playing {
            let beats = elapsed.as_secs_f64() * state.tempo / 60.0;
            state.time += beats;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Host for MemoryHost {
    fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn start_playing(&self) -> Result<(), HostError> {
        self.lock().playing = true;
        Ok(())
    }

    fn stop_playing(&self) -> Result<(), HostError> {
        self.lock().playing = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.lock().time
    }

    fn set_current_time(&self, beats: f64) -> Result<(), HostError> {
        if !beats.is_finite() || beats < 0.0 {
            return Err(HostError::invalid_value(
                "song time",
                format!("{beats} is not a non-negative beat position"),
            ));
        }
        self.lock().time = beats;
        Ok(())
    }

    fn tempo(&self) -> f64 {
        self.lock().tempo
    }

    fn set_tempo(&self, bpm: f64) -> Result<(), HostError> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
            return Err(HostError::invalid_value(
                "tempo",
                format!("{bpm} outside {MIN_TEMPO}..={MAX_TEMPO}"),
            ));
        }
        self.lock().tempo = bpm;
        Ok(())
    }

    fn record_mode(&self) -> bool {
        self.lock().record_mode
    }

    fn set_record_mode(&self, enabled: bool) -> Result<(), HostError> {
        self.lock().record_mode = enabled;
        Ok(())
    }

    fn toggle_marker_at_cursor(&self) -> Result<(), HostError> {
        let mut state = self.lock();
        let cursor = state.time;
        if let Some(existing) = state
            .markers
            .iter()
            .position(|marker| (marker.time - cursor).abs() < CURSOR_EPSILON)
        {
            state.markers.remove(existing);
        } else {
            let insert_at = state
                .markers
                .iter()
                .position(|marker| marker.time > cursor)
                .unwrap_or(state.markers.len());
            state.markers.insert(insert_at, Marker::new(cursor, ""));
        }
        Ok(())
    }

    fn markers(&self) -> Vec<Marker> {
        self.lock().markers.clone()
    }

    fn rename_marker(&self, index: usize, name: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        let marker = state
            .markers
            .get_mut(index)
            .ok_or_else(|| HostError::out_of_range("marker", index))?;
        name.clone_into(&mut marker.name);
        Ok(())
    }

    fn scene_names(&self) -> Vec<String> {
        self.lock().scenes.clone()
    }

    fn fire_scene(&self, index: usize) -> Result<(), HostError> {
        let mut state = self.lock();
        if index >= state.scenes.len() {
            return Err(HostError::out_of_range("scene", index));
        }
        state.fired_scenes.push(index);
        Ok(())
    }

    fn rename_scene(&self, index: usize, name: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        let scene = state
            .scenes
            .get_mut(index)
            .ok_or_else(|| HostError::out_of_range("scene", index))?;
        name.clone_into(scene);
        Ok(())
    }
}
