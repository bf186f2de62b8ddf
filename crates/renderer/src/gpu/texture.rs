use image::RgbaImage;

/// Every texture the renderer owns holds raw 8-bit RGBA; no sRGB decode, so
/// the GPU sees the same values the CPU lens model does.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub(crate) const BYTES_PER_PIXEL: u32 = 4;

/// A 2D texture with its default view and a linear clamp-to-edge sampler.
pub(crate) struct SampledTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: (u32, u32),
}

impl SampledTexture {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        usage: wgpu::TextureUsages,
    ) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            size,
        }
    }

    /// A sampled texture initialised from `image`.
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, image: &RgbaImage) -> Self {
        let texture = Self::new(
            device,
            label,
            image.dimensions(),
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        texture.write(queue, image);
        texture
    }

    /// A 1×1 opaque black texture bound when no real content exists yet.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue, label: &str) -> Self {
        let black = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        Self::from_image(device, queue, label, &black)
    }

    /// Uploads a full image. Sizes must match; mismatches are dropped.
    pub fn write(&self, queue: &wgpu::Queue, image: &RgbaImage) {
        if image.dimensions() != self.size {
            tracing::warn!(
                expected = ?self.size,
                actual = ?image.dimensions(),
                "texture upload ignored due to mismatched size"
            );
            return;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.size.0 * BYTES_PER_PIXEL),
                rows_per_image: Some(self.size.1),
            },
            extent(self.size),
        );
    }
}

pub(crate) fn extent(size: (u32, u32)) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.0,
        height: size.1,
        depth_or_array_layers: 1,
    }
}
