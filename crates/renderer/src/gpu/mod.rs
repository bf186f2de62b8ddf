//! GPU side of the lens renderer.
//!
//! - `context` owns the wgpu instance, device, and swapchain.
//! - `pipeline` compiles the embedded GLSL into the lens and present pipelines.
//! - `viewport` keeps the plane geometry and offscreen target sized to the
//!   window, rebuilt as one unit on resize.
//! - `frame_texture` streams camera frames into a texture, skipping repeats.
//! - `uniforms` mirrors the GLSL uniform blocks.
//! - `readback` copies the offscreen target back to the CPU for captures.
//! - `state` ties it together behind `GpuState`.

mod context;
mod frame_texture;
mod pipeline;
mod readback;
mod state;
mod texture;
mod uniforms;
mod viewport;

pub(crate) use state::{GpuState, Scene};
