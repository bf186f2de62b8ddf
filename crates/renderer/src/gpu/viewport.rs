use lens::{ResizeOutcome, Viewport, ViewportError};
use wgpu::util::DeviceExt;

use super::texture::SampledTexture;

const TARGET_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC);

/// GPU resources sized to the window: the plane vertex buffer and the
/// offscreen target the lens pass renders into.
pub(crate) struct ViewportResources {
    viewport: Viewport,
    vertex_buffer: wgpu::Buffer,
    target: SampledTexture,
}

impl ViewportResources {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, ViewportError> {
        let viewport = Viewport::new(width, height)?;
        let vertex_buffer = create_vertex_buffer(device, &viewport);
        let target = create_target(device, &viewport);
        Ok(Self {
            viewport,
            vertex_buffer,
            target,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.viewport.plane().vertices().len() as u32
    }

    pub fn target(&self) -> &SampledTexture {
        &self.target
    }

    /// Rebuilds geometry and the render target for a new size. The old buffer
    /// and texture are destroyed before their replacements are created.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<ResizeOutcome, ViewportError> {
        let outcome = self.viewport.resize(width, height)?;
        if let ResizeOutcome::Resized { previous } = outcome {
            self.vertex_buffer.destroy();
            self.target.texture.destroy();
            self.vertex_buffer = create_vertex_buffer(device, &self.viewport);
            self.target = create_target(device, &self.viewport);
            tracing::debug!(
                from = ?(previous.width, previous.height),
                to = ?self.viewport.size(),
                generation = self.viewport.generation(),
                "viewport resized"
            );
        }
        Ok(outcome)
    }
}

fn create_vertex_buffer(device: &wgpu::Device, viewport: &Viewport) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("plane vertices"),
        contents: bytemuck::cast_slice(viewport.plane().vertices()),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

fn create_target(device: &wgpu::Device, viewport: &Viewport) -> SampledTexture {
    SampledTexture::new(device, "lens target", viewport.size(), TARGET_USAGE)
}
