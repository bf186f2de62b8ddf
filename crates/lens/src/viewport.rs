//! Geometry that must change together whenever the host surface resizes.
//!
//! `Viewport::resize` swaps the projection, plane geometry, and aspect ratio
//! in one step. The GPU side (`renderer::gpu::viewport`) rebuilds its buffers
//! from the values produced here, so a frame never sees a mix of old and new.

use bytemuck::{Pod, Zeroable};

/// Near/far planes of the orthographic camera; the plane sits at z = 0 and
/// the camera at z = [`CAMERA_Z`].
pub const NEAR: f32 = 1.0;
pub const FAR: f32 = 1000.0;
pub const CAMERA_Z: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewportError {
    #[error("viewport dimensions must be non-zero (got {width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Host surface size and the aspect ratio derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
}

impl ViewportState {
    pub fn new(width: u32, height: u32) -> Result<Self, ViewportError> {
        if width == 0 || height == 0 {
            return Err(ViewportError::Empty { width, height });
        }
        Ok(Self {
            width,
            height,
            aspect_ratio: width as f32 / height as f32,
        })
    }
}

/// Orthographic camera spanning `[-w/2, w/2] × [-h/2, h/2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicProjection {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthographicProjection {
    pub fn new(width: u32, height: u32) -> Self {
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        Self {
            left: -half_w,
            right: half_w,
            top: half_h,
            bottom: -half_h,
            near: NEAR,
            far: FAR,
        }
    }

    /// Column-major view-projection matrix in wgpu clip space (z ∈ [0, 1]),
    /// with the camera translated to `CAMERA_Z`.
    pub fn matrix(&self) -> [[f32; 4]; 4] {
        let width = self.right - self.left;
        let height = self.top - self.bottom;
        let depth = self.far - self.near;
        [
            [2.0 / width, 0.0, 0.0, 0.0],
            [0.0, 2.0 / height, 0.0, 0.0],
            [0.0, 0.0, -1.0 / depth, 0.0],
            [
                -(self.right + self.left) / width,
                -(self.top + self.bottom) / height,
                (CAMERA_Z - self.near) / depth,
                1.0,
            ],
        ]
    }

    /// Applies [`matrix`](Self::matrix) to a world-space point.
    pub fn project(&self, point: [f32; 3]) -> [f32; 3] {
        let m = self.matrix();
        let mut out = [0.0; 3];
        for (row, value) in out.iter_mut().enumerate() {
            *value = m[0][row] * point[0] + m[1][row] * point[1] + m[2][row] * point[2] + m[3][row];
        }
        out
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Full-bleed quad, two counter-clockwise triangles, `uv (0, 0)` bottom-left.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    pub width: f32,
    pub height: f32,
    vertices: [PlaneVertex; 6],
}

impl PlaneGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        let corner = |x: f32, y: f32, u: f32, v: f32| PlaneVertex {
            position: [x, y],
            uv: [u, v],
        };
        let bl = corner(-half_w, -half_h, 0.0, 0.0);
        let br = corner(half_w, -half_h, 1.0, 0.0);
        let tr = corner(half_w, half_h, 1.0, 1.0);
        let tl = corner(-half_w, half_h, 0.0, 1.0);
        Self {
            width: width as f32,
            height: height as f32,
            vertices: [bl, br, tr, bl, tr, tl],
        }
    }

    pub fn vertices(&self) -> &[PlaneVertex] {
        &self.vertices
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeOutcome {
    Unchanged,
    Resized { previous: ViewportState },
}

/// Viewport state plus the geometry derived from it.
///
/// `generation` increases on every applied resize so GPU resources can tell
/// whether they are stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    state: ViewportState,
    projection: OrthographicProjection,
    plane: PlaneGeometry,
    generation: u64,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, ViewportError> {
        let state = ViewportState::new(width, height)?;
        Ok(Self {
            state,
            projection: OrthographicProjection::new(width, height),
            plane: PlaneGeometry::new(width, height),
            generation: 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<ResizeOutcome, ViewportError> {
        let state = ViewportState::new(width, height)?;
        if state == self.state {
            return Ok(ResizeOutcome::Unchanged);
        }

        let previous = self.state;
        *self = Self {
            state,
            projection: OrthographicProjection::new(width, height),
            plane: PlaneGeometry::new(width, height),
            generation: self.generation + 1,
        };
        Ok(ResizeOutcome::Resized { previous })
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn size(&self) -> (u32, u32) {
        (self.state.width, self.state.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.state.aspect_ratio
    }

    pub fn projection(&self) -> &OrthographicProjection {
        &self.projection
    }

    pub fn plane(&self) -> &PlaneGeometry {
        &self.plane
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn plane_corners_project_to_clip_corners() {
        let viewport = Viewport::new(800, 600).unwrap();
        let projection = viewport.projection();
        assert!(approx(projection.project([-400.0, -300.0, 0.0]), [-1.0, -1.0, 0.0]));
        assert!(approx(projection.project([400.0, 300.0, 0.0]), [1.0, 1.0, 0.0]));
        assert!(approx(projection.project([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]));
    }

    #[test]
    fn depth_range_spans_near_to_far() {
        let projection = OrthographicProjection::new(10, 10);
        let near = projection.project([0.0, 0.0, CAMERA_Z - NEAR]);
        let far = projection.project([0.0, 0.0, CAMERA_Z - FAR]);
        assert!(near[2].abs() < 1e-6);
        assert!((far[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn plane_covers_exact_dimensions() {
        let plane = PlaneGeometry::new(1280, 720);
        let xs: Vec<f32> = plane.vertices().iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = plane.vertices().iter().map(|v| v.position[1]).collect();
        let span = |values: &[f32]| {
            values.iter().cloned().fold(f32::MIN, f32::max)
                - values.iter().cloned().fold(f32::MAX, f32::min)
        };
        assert_eq!(span(&xs), 1280.0);
        assert_eq!(span(&ys), 720.0);
        assert_eq!(plane.vertices().len(), 6);
    }

    #[test]
    fn empty_sizes_are_rejected_without_touching_state() {
        let mut viewport = Viewport::new(640, 480).unwrap();
        let before = viewport.clone();
        assert_eq!(
            viewport.resize(0, 480),
            Err(ViewportError::Empty {
                width: 0,
                height: 480
            })
        );
        assert_eq!(viewport, before);
    }

    #[test]
    fn same_size_resize_keeps_generation() {
        let mut viewport = Viewport::new(640, 480).unwrap();
        assert_eq!(viewport.resize(640, 480), Ok(ResizeOutcome::Unchanged));
        assert_eq!(viewport.generation(), 0);
    }
}
