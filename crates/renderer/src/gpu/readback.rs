use anyhow::{anyhow, Context, Result};
use image::RgbaImage;

use super::texture::{extent, SampledTexture, BYTES_PER_PIXEL};

pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    align_to(width * BYTES_PER_PIXEL, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// Drops the per-row alignment padding of a mapped copy.
pub(crate) fn strip_row_padding(
    mapped: &[u8],
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
) -> Result<Vec<u8>> {
    let unpadded = (width * BYTES_PER_PIXEL) as usize;
    let padded = padded_bytes_per_row as usize;
    let required_len = padded * height as usize;
    if mapped.len() < required_len {
        return Err(anyhow!(
            "mapped frame too small: expected at least {required_len} bytes, got {}",
            mapped.len()
        ));
    }

    let mut pixels = Vec::with_capacity(unpadded * height as usize);
    for row in mapped.chunks_exact(padded).take(height as usize) {
        pixels.extend_from_slice(&row[..unpadded]);
    }
    Ok(pixels)
}

/// Appends a copy of `source` to `encoder`, submits, and blocks until the
/// pixels are mapped. Row 0 of the result is the top of the texture.
pub(crate) fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    mut encoder: wgpu::CommandEncoder,
    source: &SampledTexture,
) -> Result<RgbaImage> {
    let (width, height) = source.size;
    let padded = padded_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture readback"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &source.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        extent(source.size),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .context("GPU device poll failed during readback")?;
    receiver
        .recv()
        .map_err(|_| anyhow!("failed receiving GPU map callback"))?
        .context("GPU buffer mapping failed")?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        strip_row_padding(&mapped, width, height, padded)?
    };
    buffer.unmap();

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("readback produced a short buffer for {width}x{height}"))
}
