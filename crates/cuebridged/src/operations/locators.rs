//! Locator (arrangement marker) queries and navigation.
//!
//! Creating locators needs several owner-thread ticks and lives in the
//! workflow engine instead.

use serde_json::json;

use crate::host::Host;

use super::{OperationError, OperationResult, Params};

pub(super) fn get_locators(host: &dyn Host, _params: &Params) -> OperationResult {
    let locators: Vec<_> = host
        .markers()
        .into_iter()
        .enumerate()
        .map(|(index, marker)| json!({ "index": index, "time": marker.time, "name": marker.name }))
        .collect();
    Ok(json!({ "locators": locators }))
}

/// Lists locator names in timeline order.
///
/// # Errors
///
/// Never fails; the signature matches the other operations.
pub fn get_locator_names(host: &dyn Host, _params: &Params) -> OperationResult {
    let names: Vec<_> = host.markers().into_iter().map(|marker| marker.name).collect();
    Ok(json!({ "names": names }))
}

/// Moves the cursor to the locator at `index`.
///
/// # Errors
///
/// Fails when the index is missing, out of range, or the host rejects the
/// move.
pub fn jump_to_locator(host: &dyn Host, params: &Params) -> OperationResult {
    let index = params.required_usize("index")?;
    let marker = host
        .markers()
        .into_iter()
        .nth(index)
        .ok_or_else(|| OperationError::out_of_range("locator", index))?;
    host.set_current_time(marker.time)?;
    Ok(json!({ "index": index, "position": marker.time, "name": marker.name }))
}
