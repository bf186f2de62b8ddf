//! Convex-mirror lens model shared by the GPU renderer and the still renderer.
//!
//! Everything in this crate is pure: no GPU handles, no camera handles. The
//! renderer mirrors the same math in `renderer/shaders/lens.frag`, and the
//! tests in this crate pin the behaviour both sides must agree on.
//!
//! ```text
//!   PixelSource ──▶ shader::shade(uv, LensUniforms) ──▶ Rgb
//!                          ▲
//!   Viewport::resize ──────┘ aspect_ratio, projection, plane geometry
//! ```

pub mod math;
pub mod params;
pub mod render;
pub mod shader;
pub mod source;
pub mod viewport;

pub use params::{LensParameters, LensShape, DEFAULT_RADIUS, DEFAULT_STEP, RIM_WIDTH};
pub use render::render_image;
pub use shader::{shade, LensUniforms, Region};
pub use source::{PixelSource, Rgb, Uniform};
pub use viewport::{
    OrthographicProjection, PlaneGeometry, PlaneVertex, ResizeOutcome, Viewport, ViewportError,
    ViewportState,
};
