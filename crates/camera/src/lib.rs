//! Live camera frames for the lens renderer.
//!
//! - [`FrameSource`] owns exactly one capture worker at a time and swaps it on
//!   a facing toggle, stopping the old device before opening the next.
//! - [`CameraBackend`] abstracts device acquisition; [`NokhwaBackend`] is the
//!   production implementation.
//! - [`list_devices`] enumerates cameras for the CLI.

mod backend;
mod device;
mod source;
mod types;
mod worker;

pub use backend::{CameraBackend, CameraStream, NokhwaBackend};
pub use device::list_devices;
pub use source::{FrameSource, SourceConfig, SwitchHandle, SwitchRequest};
pub use types::{CameraError, CameraInfo, Facing, Frame, StreamRequest};
