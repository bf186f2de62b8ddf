use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Which way the camera points, in phone terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Towards the user (front camera).
    User,
    /// Away from the user (back camera).
    Environment,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::User => f.write_str("user"),
            Facing::Environment => f.write_str("environment"),
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "front" => Ok(Facing::User),
            "environment" | "back" | "rear" => Ok(Facing::Environment),
            other => Err(format!(
                "unknown facing '{other}'; expected user or environment"
            )),
        }
    }
}

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Stream settings requested from a device; the device may pick something close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            mirror: false,
        }
    }
}

/// One decoded camera frame.
///
/// `sequence` increases with every frame delivered by any worker, so a
/// consumer can skip uploads when nothing changed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Arc<RgbaImage>,
    pub sequence: u64,
}

impl Frame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("failed to query cameras: {0}")]
    QueryFailed(String),
    #[error("camera device {0} not found")]
    DeviceNotFound(u32),
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("camera stream failed: {0}")]
    StreamFailed(String),
}
