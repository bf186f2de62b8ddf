use std::io;
use std::path::PathBuf;

/// Failures that abort a single capture. None of them stop the render loop.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to snapshot the rendered frame: {0}")]
    Snapshot(String),
    #[error("failed to encode capture")]
    Encode(#[source] image::ImageError),
    #[error("failed to decode capture for preview")]
    Decode(#[source] image::ImageError),
    #[error("failed to write capture to {path}")]
    Download {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("capture worker disconnected before returning a result")]
    WorkerDisconnected,
}

/// Why a share attempt did not complete. Never surfaced to the user; the
/// capture falls through to the configured fallback instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    #[error("share was cancelled")]
    Cancelled,
    #[error("share failed: {0}")]
    Failed(String),
}
