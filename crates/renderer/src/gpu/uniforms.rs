use bytemuck::{Pod, Zeroable};
use lens::{LensUniforms, Viewport};

/// Backdrop brightness behind the preview modal.
pub(crate) const PREVIEW_BACKDROP_DIM: f32 = 0.25;
/// Share of the window the preview may cover along its limiting axis.
pub(crate) const PREVIEW_FILL: f32 = 0.8;

/// Mirrors the `LensParams` block shared by `lens.vert` and `lens.frag`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct LensBlock {
    pub projection: [[f32; 4]; 4],
    /// curvature, zoom, aspect ratio, radius
    pub lens: [f32; 4],
    /// rim width, then padding
    pub shape: [f32; 4],
}

unsafe impl Zeroable for LensBlock {}
unsafe impl Pod for LensBlock {}

impl LensBlock {
    pub fn new(viewport: &Viewport, uniforms: &LensUniforms) -> Self {
        Self {
            projection: viewport.projection().matrix(),
            lens: [
                uniforms.curvature,
                uniforms.zoom,
                uniforms.aspect_ratio,
                uniforms.shape.radius,
            ],
            shape: [uniforms.shape.rim_width, 0.0, 0.0, 0.0],
        }
    }
}

/// Mirrors the `PresentParams` block in `present.frag`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct PresentBlock {
    /// flash opacity, preview visible, backdrop dim, padding
    pub overlay: [f32; 4],
    /// preview rectangle as min.xy, max.xy in texture space
    pub preview_rect: [f32; 4],
}

unsafe impl Zeroable for PresentBlock {}
unsafe impl Pod for PresentBlock {}

impl PresentBlock {
    pub fn new(flash_opacity: f32, preview: Option<[f32; 4]>) -> Self {
        let (visible, rect) = match preview {
            Some(rect) => (1.0, rect),
            None => (0.0, [0.0; 4]),
        };
        Self {
            overlay: [flash_opacity.clamp(0.0, 1.0), visible, PREVIEW_BACKDROP_DIM, 0.0],
            preview_rect: rect,
        }
    }
}

/// Fits an image into the centre of the window, aspect preserved, covering at
/// most [`PREVIEW_FILL`] of the window. Returns texture-space bounds.
pub(crate) fn preview_rect(window: (u32, u32), image: (u32, u32)) -> [f32; 4] {
    let (window_w, window_h) = (window.0.max(1) as f32, window.1.max(1) as f32);
    let (image_w, image_h) = (image.0.max(1) as f32, image.1.max(1) as f32);

    let scale = (window_w * PREVIEW_FILL / image_w).min(window_h * PREVIEW_FILL / image_h);
    let half_w = image_w * scale / window_w / 2.0;
    let half_h = image_h * scale / window_h / 2.0;
    [0.5 - half_w, 0.5 - half_h, 0.5 + half_w, 0.5 + half_h]
}
