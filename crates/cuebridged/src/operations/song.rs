//! Transport, tempo, and record-mode operations.

use serde_json::json;

use crate::host::Host;

use super::{OperationResult, Params};

pub(super) fn get_session_info(host: &dyn Host, _params: &Params) -> OperationResult {
    Ok(json!({
        "tempo": host.tempo(),
        "is_playing": host.is_playing(),
        "current_time": host.current_time(),
        "record_mode": host.record_mode(),
        "scene_count": host.scene_names().len(),
        "locator_count": host.markers().len(),
    }))
}

pub(super) fn get_recording_status(host: &dyn Host, _params: &Params) -> OperationResult {
    Ok(json!({
        "record_mode": host.record_mode(),
        "is_playing": host.is_playing(),
        "current_time": host.current_time(),
    }))
}

pub(super) fn set_tempo(host: &dyn Host, params: &Params) -> OperationResult {
    let tempo = params.required_f64("tempo")?;
    host.set_tempo(tempo)?;
    Ok(json!({ "tempo": host.tempo() }))
}

pub(super) fn start_playback(host: &dyn Host, _params: &Params) -> OperationResult {
    host.start_playing()?;
    Ok(json!({ "playing": true }))
}

pub(super) fn stop_playback(host: &dyn Host, _params: &Params) -> OperationResult {
    host.stop_playing()?;
    Ok(json!({ "playing": false }))
}

pub(super) fn set_playback_position(host: &dyn Host, params: &Params) -> OperationResult {
    let position = params.required_f64("position")?.max(0.0);
    host.set_current_time(position)?;
    Ok(json!({ "position": position }))
}

pub(super) fn start_arrangement_recording(host: &dyn Host, _params: &Params) -> OperationResult {
    host.set_record_mode(true)?;
    if !host.is_playing() {
        host.start_playing()?;
    }
    Ok(json!({ "recording": true }))
}

pub(super) fn stop_arrangement_recording(host: &dyn Host, params: &Params) -> OperationResult {
    let stop_playback = params.bool_or("stop_playback", true)?;
    host.set_record_mode(false)?;
    if stop_playback && host.is_playing() {
        host.stop_playing()?;
    }
    Ok(json!({ "recording": false, "playing": host.is_playing() }))
}
