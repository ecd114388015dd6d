//! 2D and 3D cameras behind one capability interface.

mod camera2d;
mod camera3d;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::transform::Viewport;

pub use camera2d::Camera2D;
pub use camera3d::{Camera3D, Orbit};

/// Which camera variant is driving the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMode {
    /// Orthographic, pan/zoom/rotate in the XY plane.
    #[serde(rename = "2d")]
    Flat,
    /// Perspective orbit camera.
    #[serde(rename = "3d")]
    Orbit,
}

impl CameraMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "2d" | "flat" | "ortho" => Some(Self::Flat),
            "3d" | "orbit" | "perspective" => Some(Self::Orbit),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Flat => "2D",
            Self::Orbit => "3D",
        }
    }
}

/// World axis treated as "up" by the 3D camera and the orbit controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "y" | "y-up" | "y_up" => Some(Self::Y),
            "z" | "z-up" | "z_up" => Some(Self::Z),
            _ => None,
        }
    }

    pub fn vector(self) -> glam::Vec3 {
        match self {
            Self::Y => glam::Vec3::Y,
            Self::Z => glam::Vec3::Z,
        }
    }

    /// Component index of this axis in an `xyz` triple.
    pub fn index(self) -> usize {
        match self {
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// What the renderer needs from any camera.
pub trait CameraView {
    fn mode(&self) -> CameraMode;
    fn view_matrix(&self) -> Mat4;
    fn projection_matrix(&self) -> Mat4;
    fn set_viewport(&mut self, viewport: Viewport);
    fn reset(&mut self);

    fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// The active camera, tagged by variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Camera {
    Flat(Camera2D),
    Orbit(Camera3D),
}

impl Camera {
    /// Creates a camera of the requested mode with default parameters.
    pub fn new(mode: CameraMode, viewport: Viewport) -> Self {
        match mode {
            CameraMode::Flat => Self::Flat(Camera2D::new(viewport)),
            CameraMode::Orbit => Self::Orbit(Camera3D::new(viewport)),
        }
    }

    pub fn as_2d(&self) -> Option<&Camera2D> {
        match self {
            Self::Flat(camera) => Some(camera),
            Self::Orbit(_) => None,
        }
    }

    pub fn as_3d(&self) -> Option<&Camera3D> {
        match self {
            Self::Orbit(camera) => Some(camera),
            Self::Flat(_) => None,
        }
    }

    pub fn as_3d_mut(&mut self) -> Option<&mut Camera3D> {
        match self {
            Self::Orbit(camera) => Some(camera),
            Self::Flat(_) => None,
        }
    }

    pub fn as_2d_mut(&mut self) -> Option<&mut Camera2D> {
        match self {
            Self::Flat(camera) => Some(camera),
            Self::Orbit(_) => None,
        }
    }

    /// One-line human readable state, used by the diagnostics output.
    pub fn describe(&self) -> String {
        match self {
            Self::Flat(camera) => {
                let position = camera.position();
                format!(
                    "2D pos=({:.2}, {:.2}) zoom={:.2} rotation={:.1}",
                    position.x,
                    position.y,
                    camera.zoom(),
                    camera.rotation()
                )
            }
            Self::Orbit(camera) => {
                let orbit = camera.orbit();
                format!(
                    "3D azimuth={:.1} elevation={:.1} distance={:.2} target=({:.2}, {:.2}, {:.2})",
                    orbit.azimuth,
                    orbit.elevation,
                    orbit.distance,
                    camera.target().x,
                    camera.target().y,
                    camera.target().z
                )
            }
        }
    }
}

impl CameraView for Camera {
    fn mode(&self) -> CameraMode {
        match self {
            Self::Flat(camera) => camera.mode(),
            Self::Orbit(camera) => camera.mode(),
        }
    }

    fn view_matrix(&self) -> Mat4 {
        match self {
            Self::Flat(camera) => camera.view_matrix(),
            Self::Orbit(camera) => camera.view_matrix(),
        }
    }

    fn projection_matrix(&self) -> Mat4 {
        match self {
            Self::Flat(camera) => camera.projection_matrix(),
            Self::Orbit(camera) => camera.projection_matrix(),
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        match self {
            Self::Flat(camera) => camera.set_viewport(viewport),
            Self::Orbit(camera) => camera.set_viewport(viewport),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Flat(camera) => camera.reset(),
            Self::Orbit(camera) => camera.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_dispatches_to_variant() {
        let flat = Camera::new(CameraMode::Flat, Viewport::default());
        let orbit = Camera::new(CameraMode::Orbit, Viewport::default());
        assert_eq!(flat.mode(), CameraMode::Flat);
        assert_eq!(orbit.mode(), CameraMode::Orbit);
        assert!(flat.as_3d().is_none());
        assert!(orbit.as_3d().is_some());
        // 2D projection has no perspective divide marker.
        assert_eq!(flat.projection_matrix().z_axis.w, 0.0);
        assert_eq!(orbit.projection_matrix().z_axis.w, -1.0);
    }

    #[test]
    fn view_projection_composes_projection_after_view() {
        let mut camera = Camera::new(CameraMode::Orbit, Viewport::new(640, 480));
        if let Some(orbit) = camera.as_3d_mut() {
            orbit.set_orbit(30.0, 15.0, 6.0);
        }
        let expected = camera.projection_matrix() * camera.view_matrix();
        assert_eq!(camera.view_projection(), expected);
    }

    #[test]
    fn parses_mode_and_axis_names() {
        assert_eq!(CameraMode::from_name("2D"), Some(CameraMode::Flat));
        assert_eq!(CameraMode::from_name("perspective"), Some(CameraMode::Orbit));
        assert_eq!(CameraMode::from_name("iso"), None);
        assert_eq!(UpAxis::from_name("Z"), Some(UpAxis::Z));
        assert_eq!(UpAxis::Z.index(), 2);
    }

    #[test]
    fn reset_through_interface() {
        let mut camera = Camera::new(CameraMode::Orbit, Viewport::default());
        if let Some(camera) = camera.as_3d_mut() {
            camera.set_fov(90.0);
        }
        camera.reset();
        assert_eq!(camera.as_3d().unwrap().fov(), 45.0);
    }
}
