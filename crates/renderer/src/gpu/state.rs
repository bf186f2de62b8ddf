use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use camera::Frame;
use image::RgbaImage;
use lens::{LensParameters, LensShape, LensUniforms, ResizeOutcome};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use super::context::GpuContext;
use super::frame_texture::FrameTexture;
use super::pipeline::Pipelines;
use super::readback;
use super::texture::SampledTexture;
use super::uniforms::{preview_rect, LensBlock, PresentBlock};
use super::viewport::ViewportResources;

/// Per-frame inputs gathered by the window loop.
pub(crate) struct Scene<'a> {
    pub params: LensParameters,
    pub shape: LensShape,
    pub frame: Option<&'a Frame>,
    pub flash_opacity: f32,
    pub preview: Option<&'a RgbaImage>,
}

pub(crate) struct GpuState {
    context: GpuContext,
    pipelines: Pipelines,
    viewport: ViewportResources,
    camera: FrameTexture,
    lens_buffer: wgpu::Buffer,
    lens_bind_group: wgpu::BindGroup,
    present_buffer: wgpu::Buffer,
    present_bind_group: wgpu::BindGroup,
    present_textures: wgpu::BindGroup,
    preview: Option<SampledTexture>,
    preview_placeholder: SampledTexture,
    stats: FrameStats,
}

impl GpuState {
    pub(crate) fn new<T>(target: &T, initial_size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let device = &context.device;
        let queue = &context.queue;

        let pipelines = Pipelines::new(device, context.surface_format)?;
        let viewport = ViewportResources::new(device, context.size.width, context.size.height)
            .context("window reported an empty surface")?;
        let camera = FrameTexture::new(device, queue, &pipelines);

        let lens_buffer =
            create_uniform_buffer(device, "lens uniforms", std::mem::size_of::<LensBlock>());
        let lens_bind_group = pipelines.uniform_bind_group(device, &lens_buffer);
        let present_buffer =
            create_uniform_buffer(device, "present uniforms", std::mem::size_of::<PresentBlock>());
        let present_bind_group = pipelines.uniform_bind_group(device, &present_buffer);

        let preview_placeholder = SampledTexture::placeholder(device, queue, "preview placeholder");
        let present_textures =
            pipelines.present_bind_group(device, viewport.target(), &preview_placeholder);

        Ok(Self {
            context,
            pipelines,
            viewport,
            camera,
            lens_buffer,
            lens_bind_group,
            present_buffer,
            present_bind_group,
            present_textures,
            preview: None,
            preview_placeholder,
            stats: FrameStats::new(),
        })
    }

    pub(crate) fn aspect_ratio(&self) -> f32 {
        self.viewport.viewport().aspect_ratio()
    }

    /// Applies a new window size to the geometry, the render target, and the
    /// swapchain, in that order. Zero-sized and unchanged sizes are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if !self.context.fits(new_size) {
            warn!(
                width = new_size.width,
                height = new_size.height,
                max = self.context.max_texture_dimension,
                "window exceeds the GPU texture limit; keeping the previous size"
            );
            return;
        }

        let device = &self.context.device;
        match self.viewport.resize(device, new_size.width, new_size.height) {
            Ok(ResizeOutcome::Resized { .. }) => {
                self.context.resize(new_size);
                self.rebuild_present_textures();
            }
            Ok(ResizeOutcome::Unchanged) => {}
            Err(err) => debug!(error = %err, "ignoring resize"),
        }
    }

    /// Reconfigures the swapchain after `Lost`/`Outdated`.
    pub(crate) fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn render(&mut self, scene: &Scene<'_>) -> Result<(), wgpu::SurfaceError> {
        let acquire_start = Instant::now();
        let frame = self.context.surface.get_current_texture()?;
        self.stats.record(acquire_start.elapsed());

        self.prepare_lens(scene);
        self.prepare_present(scene);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        self.encode_lens_pass(&mut encoder);
        self.encode_present_pass(&mut encoder, &view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Renders the lens pass for `scene` right now and reads the target back.
    /// Overlays are not part of the target, so the flash never lands in a
    /// capture.
    pub(crate) fn snapshot(&mut self, scene: &Scene<'_>) -> Result<RgbaImage> {
        self.prepare_lens(scene);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("snapshot encoder"),
                });
        self.encode_lens_pass(&mut encoder);
        readback::read_texture(
            &self.context.device,
            &self.context.queue,
            encoder,
            self.viewport.target(),
        )
        .context("failed to read back the lens target")
    }

    fn prepare_lens(&mut self, scene: &Scene<'_>) {
        self.camera.sync(
            &self.context.device,
            &self.context.queue,
            &self.pipelines,
            scene.frame,
        );
        let uniforms = LensUniforms::new(scene.params, self.aspect_ratio(), scene.shape);
        let block = LensBlock::new(self.viewport.viewport(), &uniforms);
        self.context
            .queue
            .write_buffer(&self.lens_buffer, 0, bytemuck::bytes_of(&block));
    }

    fn prepare_present(&mut self, scene: &Scene<'_>) {
        match (scene.preview, self.preview.is_some()) {
            (Some(image), false) => {
                self.preview = Some(SampledTexture::from_image(
                    &self.context.device,
                    &self.context.queue,
                    "capture preview",
                    image,
                ));
                self.rebuild_present_textures();
            }
            (None, true) => {
                if let Some(preview) = self.preview.take() {
                    preview.texture.destroy();
                }
                self.rebuild_present_textures();
            }
            _ => {}
        }

        let rect = self
            .preview
            .as_ref()
            .map(|preview| preview_rect(self.viewport.viewport().size(), preview.size));
        let block = PresentBlock::new(scene.flash_opacity, rect);
        self.context
            .queue
            .write_buffer(&self.present_buffer, 0, bytemuck::bytes_of(&block));
    }

    fn rebuild_present_textures(&mut self) {
        let preview = self.preview.as_ref().unwrap_or(&self.preview_placeholder);
        self.present_textures = self.pipelines.present_bind_group(
            &self.context.device,
            self.viewport.target(),
            preview,
        );
    }

    fn encode_lens_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lens pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.viewport.target().view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipelines.lens);
        pass.set_bind_group(0, &self.lens_bind_group, &[]);
        pass.set_bind_group(1, self.camera.bind_group(), &[]);
        pass.set_vertex_buffer(0, self.viewport.vertex_buffer().slice(..));
        pass.draw(0..self.viewport.vertex_count(), 0..1);
    }

    fn encode_present_pass(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipelines.present);
        pass.set_bind_group(0, &self.present_bind_group, &[]);
        pass.set_bind_group(1, &self.present_textures, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Frame pacing statistics, logged once per second at debug level.
struct FrameStats {
    last_update: Instant,
    frames_since_update: u32,
    frames_per_second: f32,
    frame_count: u64,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frames_since_update: 0,
            frames_per_second: 60.0,
            frame_count: 0,
        }
    }

    fn record(&mut self, acquisition: Duration) {
        let budget = Duration::from_secs_f32(1.0 / self.frames_per_second.max(1.0));
        if acquisition > budget {
            warn!(
                "acquiring frame took {}ms, which is over the frame budget of {}ms (at {} FPS)",
                acquisition.as_millis(),
                budget.as_millis(),
                self.frames_per_second.round(),
            );
        }

        let now = Instant::now();
        self.frame_count += 1;
        self.frames_since_update += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_since_update as f32 / elapsed.as_secs_f32();
            self.frames_since_update = 0;
            self.last_update = now;
            debug!(
                fps = self.frames_per_second.round(),
                frame_count = self.frame_count,
                "render stats"
            );
        }
    }
}
