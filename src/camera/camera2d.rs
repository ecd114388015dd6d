use glam::{Mat4, Vec2};
use log::info;

use super::{CameraMode, CameraView};
use crate::transform::{self, Viewport};

pub const MIN_ZOOM: f32 = 0.01;

/// Orthographic camera with a pan offset, uniform zoom and in-plane rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2D {
    viewport: Viewport,
    position: Vec2,
    zoom: f32,
    rotation: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera2D {
    pub fn new(viewport: Viewport) -> Self {
        let mut camera = Self {
            viewport,
            position: Vec2::ZERO,
            zoom: 1.0,
            rotation: 0.0,
            near: -10.0,
            far: 10.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_view();
        camera.update_projection();
        info!("Camera2D initialized");
        camera
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.update_view();
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Sets the zoom factor, clamped to at least `MIN_ZOOM`.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.max(MIN_ZOOM);
        self.update_projection();
    }

    /// Rotation in degrees, always within `[0, 360)`.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        let normalized = degrees.rem_euclid(360.0);
        // rem_euclid can round tiny negatives up to exactly 360.
        self.rotation = if normalized >= 360.0 { 0.0 } else { normalized };
        self.update_view();
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.update_projection();
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.aspect()
    }

    fn update_view(&mut self) {
        self.view = transform::view_2d(self.position, self.rotation);
    }

    fn update_projection(&mut self) {
        let half_width = self.aspect() / self.zoom;
        let half_height = 1.0 / self.zoom;
        self.projection = transform::orthographic(
            -half_width,
            half_width,
            -half_height,
            half_height,
            self.near,
            self.far,
        );
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl CameraView for Camera2D {
    fn mode(&self) -> CameraMode {
        CameraMode::Flat
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.update_projection();
    }

    fn reset(&mut self) {
        self.position = Vec2::ZERO;
        self.zoom = 1.0;
        self.rotation = 0.0;
        self.update_view();
        self.update_projection();
        info!("Camera2D reset to default");
    }
}
