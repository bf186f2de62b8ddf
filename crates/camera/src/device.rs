use nokhwa::query;
use nokhwa::utils::ApiBackend;

use crate::types::{CameraError, CameraInfo};

/// Lists the cameras visible to the platform backend.
///
/// An empty list is not an error.
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let devices = query(ApiBackend::Auto).map_err(|err| CameraError::QueryFailed(err.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|device| CameraInfo {
            index: device.index().as_index().unwrap_or(0),
            name: device.human_name(),
            description: device.description().to_string(),
        })
        .collect())
}
