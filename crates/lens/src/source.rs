use image::RgbaImage;

/// Linear RGB triple in `[0, 1]` (values may exceed 1 before quantisation).
pub type Rgb = [f32; 3];

/// Anything the lens can sample from.
///
/// Coordinates follow the GPU convention used by the renderer: `u` grows to
/// the right and `v = 1` is the top row of the image.
pub trait PixelSource {
    fn dimensions(&self) -> (u32, u32);

    /// Bilinear sample at `uv`; callers only pass coordinates inside `[0, 1]²`.
    fn sample(&self, uv: [f32; 2]) -> Rgb;
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn sample(&self, uv: [f32; 2]) -> Rgb {
        let (width, height) = RgbaImage::dimensions(self);
        if width == 0 || height == 0 {
            return [0.0; 3];
        }

        let x = (uv[0] * width as f32 - 0.5).clamp(0.0, (width - 1) as f32);
        let y = ((1.0 - uv[1]) * height as f32 - 0.5).clamp(0.0, (height - 1) as f32);
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(width - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let texel = |px: u32, py: u32| {
            let pixel = self.get_pixel(px, py);
            [
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
            ]
        };
        let top_left = texel(x0, y0);
        let top_right = texel(x1, y0);
        let bottom_left = texel(x0, y1);
        let bottom_right = texel(x1, y1);

        let mut out = [0.0; 3];
        for channel in 0..3 {
            let top = top_left[channel] * (1.0 - fx) + top_right[channel] * fx;
            let bottom = bottom_left[channel] * (1.0 - fx) + bottom_right[channel] * fx;
            out[channel] = top * (1.0 - fy) + bottom * fy;
        }
        out
    }
}

/// Solid-colour source; stands in for a camera before the first frame lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub color: Rgb,
    pub width: u32,
    pub height: u32,
}

impl Uniform {
    pub fn new(color: Rgb, width: u32, height: u32) -> Self {
        Self {
            color,
            width,
            height,
        }
    }

    pub fn gray(level: f32, width: u32, height: u32) -> Self {
        Self::new([level; 3], width, height)
    }
}

impl PixelSource for Uniform {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn sample(&self, _uv: [f32; 2]) -> Rgb {
        self.color
    }
}
