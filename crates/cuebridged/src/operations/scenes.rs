//! Scene listing, launching, and renaming.

use serde_json::json;

use crate::host::Host;

use super::{OperationError, OperationResult, Params};

pub(super) fn get_scenes(host: &dyn Host, _params: &Params) -> OperationResult {
    let scenes: Vec<_> = host
        .scene_names()
        .into_iter()
        .enumerate()
        .map(|(index, name)| json!({ "index": index, "name": name }))
        .collect();
    Ok(json!({ "scenes": scenes }))
}

pub(super) fn trigger_scene(host: &dyn Host, params: &Params) -> OperationResult {
    let index = params.required_usize("scene_index")?;
    let name = scene_name(host, index)?;
    host.fire_scene(index)?;
    Ok(json!({ "scene_index": index, "name": name }))
}

pub(super) fn set_scene_name(host: &dyn Host, params: &Params) -> OperationResult {
    let index = params.required_usize("scene_index")?;
    let name = params.required_str("name")?;
    host.rename_scene(index, name)?;
    Ok(json!({ "scene_index": index, "name": name }))
}

fn scene_name(host: &dyn Host, index: usize) -> Result<String, OperationError> {
    host.scene_names()
        .into_iter()
        .nth(index)
        .ok_or_else(|| OperationError::out_of_range("scene", index))
}
