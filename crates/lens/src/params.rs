/// Width of the white rim drawn just outside the lens radius.
pub const RIM_WIDTH: f32 = 0.015;

/// Lens radius in aspect-corrected normalized space.
///
/// Deployments may pick anything in `[MIN_RADIUS, MAX_RADIUS]`; the larger
/// radius leaves less backdrop on small windows.
pub const DEFAULT_RADIUS: f32 = 0.48;
pub const MIN_RADIUS: f32 = 0.45;
pub const MAX_RADIUS: f32 = 0.48;

pub const MIN_CURVATURE: f32 = 0.0;
pub const MAX_CURVATURE: f32 = 1.0;
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 4.0;

/// Default keyboard nudge for curvature and zoom.
pub const DEFAULT_STEP: f32 = 0.05;

/// Specular highlight anchor in aspect-corrected space (upper left of centre).
pub const HIGHLIGHT_POSITION: [f32; 2] = [-0.15, 0.15];
pub const HIGHLIGHT_FALLOFF: f32 = 0.25;
pub const HIGHLIGHT_STRENGTH: f32 = 0.15;

/// `rn` range over which the vignette blends down to [`VIGNETTE_FLOOR`].
pub const VIGNETTE_START: f32 = 0.8;
pub const VIGNETTE_END: f32 = 1.0;
pub const VIGNETTE_FLOOR: f32 = 0.5;

/// User-controlled lens parameters, read by the shader every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensParameters {
    curvature: f32,
    zoom: f32,
}

impl LensParameters {
    /// Builds parameters, clamping both values into their supported ranges.
    pub fn new(curvature: f32, zoom: f32) -> Self {
        let mut params = Self::default();
        params.set_curvature(curvature);
        params.set_zoom(zoom);
        params
    }

    pub fn curvature(&self) -> f32 {
        self.curvature
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_curvature(&mut self, curvature: f32) {
        if curvature.is_finite() {
            self.curvature = curvature.clamp(MIN_CURVATURE, MAX_CURVATURE);
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn nudge_curvature(&mut self, delta: f32) {
        self.set_curvature(self.curvature + delta);
    }

    pub fn nudge_zoom(&mut self, delta: f32) {
        self.set_zoom(self.zoom + delta);
    }

    /// Percent labels as shown next to the original sliders.
    pub fn percent_labels(&self) -> (u32, u32) {
        (
            (self.curvature * 100.0).round() as u32,
            (self.zoom * 100.0).round() as u32,
        )
    }
}

impl Default for LensParameters {
    fn default() -> Self {
        Self {
            curvature: 0.5,
            zoom: 1.0,
        }
    }
}

/// Fixed silhouette of the mirror for one deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensShape {
    pub radius: f32,
    pub rim_width: f32,
}

impl LensShape {
    pub fn with_radius(radius: f32) -> Self {
        Self {
            radius,
            rim_width: RIM_WIDTH,
        }
    }

    /// Outer edge of the rim band.
    pub fn rim_outer(&self) -> f32 {
        self.radius + self.rim_width
    }
}

impl Default for LensShape {
    fn default() -> Self {
        Self::with_radius(DEFAULT_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_clamp_into_range() {
        let params = LensParameters::new(1.7, -3.0);
        assert_eq!(params.curvature(), MAX_CURVATURE);
        assert_eq!(params.zoom(), MIN_ZOOM);
    }

    #[test]
    fn non_finite_updates_are_ignored() {
        let mut params = LensParameters::default();
        params.set_curvature(f32::NAN);
        params.set_zoom(f32::INFINITY);
        assert_eq!(params, LensParameters::default());
    }

    #[test]
    fn nudges_accumulate_and_clamp() {
        let mut params = LensParameters::new(0.9, 1.0);
        params.nudge_curvature(0.05);
        params.nudge_curvature(0.05);
        params.nudge_curvature(0.05);
        assert_eq!(params.curvature(), 1.0);
        params.nudge_zoom(-0.25);
        assert!((params.zoom() - 0.75).abs() < 1e-6);
        assert_eq!(params.percent_labels(), (100, 75));
    }
}
