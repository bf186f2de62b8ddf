use lens::{LensParameters, LensShape, DEFAULT_STEP};

pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 720);
pub const DEFAULT_TITLE: &str = "Convex Cam";

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` carries the window surface plus the initial lens state;
/// the camera and the capture machine are handed to [`crate::Renderer`]
/// separately because they own threads.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial inner size of the window in physical pixels.
    pub window_size: (u32, u32),
    /// Window title prefix; the lens percentages are appended.
    pub title: String,
    /// Starting curvature and zoom. `R` returns to these values.
    pub params: LensParameters,
    /// Mirror silhouette for this deployment.
    pub shape: LensShape,
    /// Increment applied by the arrow keys.
    pub step: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            title: DEFAULT_TITLE.to_string(),
            params: LensParameters::default(),
            shape: LensShape::default(),
            step: DEFAULT_STEP,
        }
    }
}
