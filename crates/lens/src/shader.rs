//! CPU reference of the convex-mirror fragment shader.
//!
//! Each step matches a block in `renderer/shaders/lens.frag`; keep them in
//! lockstep when tuning constants.

use crate::math::{length, mix, smoothstep, sub};
use crate::params::{
    LensParameters, LensShape, HIGHLIGHT_FALLOFF, HIGHLIGHT_POSITION, HIGHLIGHT_STRENGTH,
    VIGNETTE_END, VIGNETTE_FLOOR, VIGNETTE_START,
};
use crate::source::{PixelSource, Rgb};

const RIM_COLOR: Rgb = [1.0, 1.0, 1.0];
const BACKDROP_COLOR: Rgb = [0.0, 0.0, 0.0];

/// Everything the per-pixel function reads for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensUniforms {
    pub curvature: f32,
    pub zoom: f32,
    pub aspect_ratio: f32,
    pub shape: LensShape,
}

impl LensUniforms {
    pub fn new(params: LensParameters, aspect_ratio: f32, shape: LensShape) -> Self {
        Self {
            curvature: params.curvature(),
            zoom: params.zoom(),
            aspect_ratio,
            shape,
        }
    }
}

/// Where a pixel falls relative to the mirror silhouette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// Inside the lens; carries the centred position, its aspect-corrected
    /// twin, and the normalized radius `rn`.
    Lens {
        centred: [f32; 2],
        aspect: [f32; 2],
        rn: f32,
    },
    Rim,
    Backdrop,
}

pub fn classify(uv: [f32; 2], uniforms: &LensUniforms) -> Region {
    let centred = [uv[0] - 0.5, uv[1] - 0.5];
    let aspect = [centred[0] * uniforms.aspect_ratio, centred[1]];
    let r = length(aspect);
    let radius = uniforms.shape.radius;

    if r > radius {
        if r <= uniforms.shape.rim_outer() {
            Region::Rim
        } else {
            Region::Backdrop
        }
    } else {
        Region::Lens {
            centred,
            aspect,
            rn: r / radius,
        }
    }
}

/// Quadratic barrel factor: 1 at the centre, `1 + 2·curvature` at the edge.
pub fn distortion(curvature: f32, rn: f32) -> f32 {
    1.0 + curvature * (rn * rn * 2.0)
}

/// Source coordinate for a lens pixel, or `None` when it lands off-frame.
pub fn sample_position(centred: [f32; 2], rn: f32, uniforms: &LensUniforms) -> Option<[f32; 2]> {
    let scale = distortion(uniforms.curvature, rn) * uniforms.zoom;
    let uv = [centred[0] / scale + 0.5, centred[1] / scale + 0.5];
    let inside = (0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]);
    inside.then_some(uv)
}

pub fn highlight(aspect: [f32; 2], curvature: f32) -> f32 {
    let gloss = 1.0 - smoothstep(0.0, HIGHLIGHT_FALLOFF, length(sub(aspect, HIGHLIGHT_POSITION)));
    gloss * HIGHLIGHT_STRENGTH * curvature
}

pub fn vignette(rn: f32) -> f32 {
    smoothstep(VIGNETTE_START, VIGNETTE_END, rn)
}

/// Evaluates the lens for one output pixel. Output is opaque RGB.
pub fn shade<S>(uv: [f32; 2], uniforms: &LensUniforms, source: &S) -> Rgb
where
    S: PixelSource + ?Sized,
{
    let (centred, aspect, rn) = match classify(uv, uniforms) {
        Region::Rim => return RIM_COLOR,
        Region::Backdrop => return BACKDROP_COLOR,
        Region::Lens {
            centred,
            aspect,
            rn,
        } => (centred, aspect, rn),
    };

    let mut color = match sample_position(centred, rn, uniforms) {
        Some(position) => source.sample(position),
        None => [0.0; 3],
    };

    let gloss = highlight(aspect, uniforms.curvature);
    let darken = vignette(rn);
    for channel in &mut color {
        *channel += gloss;
        *channel = mix(*channel, *channel * VIGNETTE_FLOOR, darken);
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Uniform;

    fn uniforms(curvature: f32, zoom: f32, aspect_ratio: f32) -> LensUniforms {
        LensUniforms {
            curvature,
            zoom,
            aspect_ratio,
            shape: LensShape::with_radius(0.45),
        }
    }

    #[test]
    fn zero_curvature_unit_zoom_is_identity_inside_lens() {
        let u = uniforms(0.0, 1.0, 1.0);
        for &(x, y) in &[(0.5, 0.5), (0.3, 0.6), (0.7, 0.25), (0.52, 0.9)] {
            if let Region::Lens { centred, rn, .. } = classify([x, y], &u) {
                let mapped = sample_position(centred, rn, &u).expect("inside frame");
                assert!((mapped[0] - x).abs() < 1e-6);
                assert!((mapped[1] - y).abs() < 1e-6);
            } else {
                panic!("({x}, {y}) expected inside lens");
            }
        }
    }

    #[test]
    fn curvature_pulls_samples_towards_centre() {
        let u = uniforms(1.0, 1.0, 1.0);
        let Region::Lens { centred, rn, .. } = classify([0.8, 0.5], &u) else {
            panic!("expected lens region");
        };
        let mapped = sample_position(centred, rn, &u).expect("inside frame");
        assert!(mapped[0] < 0.8 && mapped[0] > 0.5);
    }

    #[test]
    fn rim_and_backdrop_bands() {
        let u = uniforms(0.5, 1.0, 1.0);
        let source = Uniform::gray(0.5, 8, 8);
        assert_eq!(shade([0.5 + 0.455, 0.5], &u, &source), RIM_COLOR);
        assert_eq!(shade([0.5 + 0.462, 0.5], &u, &source), RIM_COLOR);
        assert_eq!(shade([0.5 + 0.47, 0.5], &u, &source), BACKDROP_COLOR);
        assert_eq!(shade([0.0, 0.0], &u, &source), BACKDROP_COLOR);
    }

    #[test]
    fn aspect_ratio_widens_the_backdrop_horizontally() {
        let u = uniforms(0.0, 1.0, 800.0 / 600.0);
        assert!(matches!(classify([0.5, 0.9], &u), Region::Lens { .. }));
        // Same offset on x is 4/3 further away once aspect-corrected.
        assert_eq!(classify([0.9, 0.5], &u), Region::Backdrop);
    }

    #[test]
    fn zoom_out_exposes_black_outside_the_frame() {
        let u = uniforms(0.0, 0.5, 1.0);
        let source = Uniform::gray(1.0, 8, 8);
        // 0.3 / 0.5 + 0.5 = 1.1: off-frame, and zero curvature adds no gloss.
        let color = shade([0.8, 0.5], &u, &source);
        assert!(color[0] < 0.01);
    }

    #[test]
    fn distortion_is_quadratic_in_normalized_radius() {
        assert_eq!(distortion(0.0, 0.7), 1.0);
        assert!((distortion(0.5, 1.0) - 2.0).abs() < 1e-6);
        assert!((distortion(1.0, 0.5) - 1.5).abs() < 1e-6);
    }
}
