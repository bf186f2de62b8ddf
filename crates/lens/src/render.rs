use image::{Rgba, RgbaImage};

use crate::params::{LensParameters, LensShape};
use crate::shader::{shade, LensUniforms};
use crate::source::{PixelSource, Rgb};

/// Runs the lens over every output pixel of a `width × height` surface.
///
/// Output row 0 is the top of the surface, matching what a GPU readback of
/// the render target produces.
pub fn render_image<S>(
    source: &S,
    params: LensParameters,
    shape: LensShape,
    width: u32,
    height: u32,
) -> RgbaImage
where
    S: PixelSource + ?Sized,
{
    let mut output = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let uniforms = LensUniforms::new(params, width as f32 / height as f32, shape);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let uv = [
            (x as f32 + 0.5) / width as f32,
            1.0 - (y as f32 + 0.5) / height as f32,
        ];
        *pixel = quantize(shade(uv, &uniforms, source));
    }
    output
}

pub fn quantize(color: Rgb) -> Rgba<u8> {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([channel(color[0]), channel(color[1]), channel(color[2]), 255])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Uniform;

    #[test]
    fn output_matches_requested_size_and_is_opaque() {
        let source = Uniform::gray(0.3, 16, 16);
        let image = render_image(&source, LensParameters::default(), LensShape::default(), 33, 17);
        assert_eq!(image.dimensions(), (33, 17));
        assert!(image.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn quantize_saturates() {
        assert_eq!(quantize([1.4, -0.2, 0.5]), Rgba([255, 0, 128, 255]));
    }
}
