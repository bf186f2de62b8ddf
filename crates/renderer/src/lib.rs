//! Live convex-mirror renderer.
//!
//! Camera frames stream into a texture, the lens pass bends them into an
//! offscreen target, and the present pass puts that target on screen with
//! the capture flash and preview modal on top:
//!
//! ```text
//!   FrameSource ──▶ FrameTexture ─┐
//!                                 ├─▶ lens pass ─▶ target ─▶ present pass ─▶ window
//!   Controls ──▶ LensBlock UBO ───┘                  │
//!                                                    └─▶ readback ─▶ CaptureMachine
//! ```
//!
//! `window::PipelineState` owns every piece of per-window state and is passed
//! explicitly to the resize, render, and capture paths. `Renderer` is the thin
//! entry point that opens the window and hands control to `winit`.

mod compile;
mod controls;
mod gpu;
mod types;
mod window;

use anyhow::Result;
use camera::FrameSource;
use capture::CaptureMachine;

pub use types::{RendererConfig, DEFAULT_TITLE, DEFAULT_WINDOW_SIZE};

/// High-level entry point that owns the chosen configuration plus the camera
/// and capture services the window drives.
pub struct Renderer {
    config: RendererConfig,
    source: FrameSource,
    capture: CaptureMachine,
}

impl Renderer {
    pub fn new(config: RendererConfig, source: FrameSource, capture: CaptureMachine) -> Self {
        Self {
            config,
            source,
            capture,
        }
    }

    /// Opens the camera window and blocks until it closes.
    ///
    /// Fails only when the window or GPU cannot be initialised; camera and
    /// capture failures are logged and the loop keeps running.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            width = self.config.window_size.0,
            height = self.config.window_size.1,
            facing = %self.source.facing(),
            "starting renderer"
        );
        window::run(self.config, self.source, self.capture)
    }
}
