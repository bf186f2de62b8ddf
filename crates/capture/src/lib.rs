//! Capture and export of rendered frames.
//!
//! [`CaptureMachine`] snapshots the frame on screen, encodes it to JPEG off the
//! render thread, and exports it through an [`ExportPlatform`]: native share
//! first, then the configured [`FallbackPolicy`] (download or in-app preview).

mod artifact;
mod error;
mod machine;
mod platform;
mod task;

pub use artifact::{
    decode_artifact, encode_jpeg, epoch_millis, suggested_file_name, CaptureArtifact,
    ExportOutcome, ShareMetadata, DEFAULT_JPEG_QUALITY, JPEG_MIME_TYPE,
};
pub use error::{CaptureError, ShareError};
pub use machine::{
    CaptureMachine, CaptureSettings, CaptureState, FallbackPolicy, FlashCue, Trigger,
    DEFAULT_FLASH_DURATION, FLASH_PEAK_OPACITY,
};
pub use platform::{expand_placeholders, DesktopPlatform, ExportPlatform};
pub use task::Dispatch;
