//! Pointer-driven camera control.
//!
//! | input          | 3D camera                  | 2D camera        |
//! |----------------|----------------------------|------------------|
//! | left drag      | orbit around the target    | rotate           |
//! | right drag     | pan in the ground plane    | pan              |
//! | middle drag    | move along the up axis     | pan              |
//! | scroll         | dolly (orbit distance)     | zoom             |

use glam::{Vec2, Vec3};
use log::info;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, Camera2D, Camera3D, CameraView};
use crate::input::InputFrame;

pub const MAX_ELEVATION: f32 = 89.0;
pub const MIN_DOLLY_DISTANCE: f32 = 0.5;
pub const MAX_DOLLY_DISTANCE: f32 = 100.0;
pub const MIN_FLAT_ZOOM: f32 = 0.1;
pub const MAX_FLAT_ZOOM: f32 = 10.0;

/// Shortest projected pan axis that is still renormalized.
const MIN_PAN_AXIS_LENGTH: f32 = 1e-3;

/// Per-pixel gains for each kind of camera motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Degrees of orbit per pixel of drag.
    orbit_sensitivity: f32,
    pan_sensitivity: f32,
    zoom_sensitivity: f32,
    /// Degrees of 2D rotation per pixel of drag.
    rotation_sensitivity: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            orbit_sensitivity: 0.5,
            pan_sensitivity: 0.01,
            zoom_sensitivity: 0.1,
            rotation_sensitivity: 0.5,
        }
    }
}

impl ControllerSettings {
    pub fn orbit_sensitivity(&self) -> f32 {
        self.orbit_sensitivity
    }

    pub fn set_orbit_sensitivity(&mut self, value: f32) {
        self.orbit_sensitivity = value.max(0.01);
    }

    pub fn pan_sensitivity(&self) -> f32 {
        self.pan_sensitivity
    }

    pub fn set_pan_sensitivity(&mut self, value: f32) {
        self.pan_sensitivity = value.max(0.001);
    }

    pub fn zoom_sensitivity(&self) -> f32 {
        self.zoom_sensitivity
    }

    pub fn set_zoom_sensitivity(&mut self, value: f32) {
        self.zoom_sensitivity = value.max(0.01);
    }

    pub fn rotation_sensitivity(&self) -> f32 {
        self.rotation_sensitivity
    }

    pub fn set_rotation_sensitivity(&mut self, value: f32) {
        self.rotation_sensitivity = value.max(0.01);
    }
}

/// Translates per-frame pointer input into camera parameter changes.
#[derive(Debug, Clone)]
pub struct OrbitController {
    settings: ControllerSettings,
    enabled: bool,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}

impl OrbitController {
    pub fn new(settings: ControllerSettings) -> Self {
        info!("OrbitController initialized");
        Self {
            settings,
            enabled: true,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ControllerSettings {
        &mut self.settings
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Disable while another consumer (e.g. a settings panel) owns the pointer.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn update(&self, camera: &mut Camera, input: &InputFrame) {
        if !self.enabled {
            return;
        }
        match camera {
            Camera::Orbit(camera) => self.update_3d(camera, input),
            Camera::Flat(camera) => self.update_2d(camera, input),
        }
    }

    pub fn update_3d(&self, camera: &mut Camera3D, input: &InputFrame) {
        let Vec2 { x: dx, y: dy } = input.delta;
        let settings = &self.settings;

        if input.left {
            let orbit = camera.orbit();
            let azimuth = orbit.azimuth - dx * settings.orbit_sensitivity;
            let elevation = (orbit.elevation + dy * settings.orbit_sensitivity)
                .clamp(-MAX_ELEVATION, MAX_ELEVATION);
            camera.set_orbit(azimuth, elevation, orbit.distance);
        }

        if input.right {
            let view = camera.view_matrix();
            let axis = camera.up_axis().index();
            let right = ground_projected(view.row(0).truncate(), axis);
            let forward = ground_projected(-view.row(2).truncate(), axis);
            let movement = -dx * settings.pan_sensitivity * right
                - dy * settings.pan_sensitivity * forward;
            camera.translate(movement);
        }

        if input.middle {
            camera.translate(camera.up_axis().vector() * (dy * settings.pan_sensitivity));
        }

        let scroll = input.scroll.y;
        if scroll != 0.0 {
            let orbit = camera.orbit();
            let distance = (orbit.distance
                - scroll * settings.zoom_sensitivity * orbit.distance * 0.1)
                .clamp(MIN_DOLLY_DISTANCE, MAX_DOLLY_DISTANCE);
            camera.set_orbit(orbit.azimuth, orbit.elevation, distance);
        }
    }

    pub fn update_2d(&self, camera: &mut Camera2D, input: &InputFrame) {
        let Vec2 { x: dx, y: dy } = input.delta;
        let settings = &self.settings;

        if input.left {
            camera.set_rotation(camera.rotation() - dx * settings.rotation_sensitivity);
        }

        if input.right || input.middle {
            let view = camera.view_matrix();
            let right = view.row(0).truncate().truncate();
            let up = view.row(1).truncate().truncate();
            let scale = settings.pan_sensitivity / camera.zoom();
            let movement = (-dx * right + dy * up) * scale;
            camera.set_position(camera.position() + movement);
        }

        let scroll = input.scroll.y;
        if scroll != 0.0 {
            let zoom = (camera.zoom() * (1.0 + scroll * settings.zoom_sensitivity))
                .clamp(MIN_FLAT_ZOOM, MAX_FLAT_ZOOM);
            camera.set_zoom(zoom);
        }
    }
}

/// Drops the up-axis component and renormalizes when something is left.
fn ground_projected(mut direction: Vec3, up_index: usize) -> Vec3 {
    direction[up_index] = 0.0;
    let length = direction.length();
    if length > MIN_PAN_AXIS_LENGTH {
        direction / length
    } else {
        direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraMode, UpAxis};
    use crate::transform::Viewport;

    fn drag(delta: Vec2) -> InputFrame {
        InputFrame {
            delta,
            ..InputFrame::default()
        }
    }

    fn orbit_camera() -> Camera {
        Camera::new(CameraMode::Orbit, Viewport::default())
    }

    #[test]
    fn sensitivities_have_floors() {
        let mut settings = ControllerSettings::default();
        settings.set_orbit_sensitivity(0.0);
        settings.set_pan_sensitivity(-1.0);
        settings.set_zoom_sensitivity(0.001);
        settings.set_rotation_sensitivity(0.0);
        assert_eq!(settings.orbit_sensitivity(), 0.01);
        assert_eq!(settings.pan_sensitivity(), 0.001);
        assert_eq!(settings.zoom_sensitivity(), 0.01);
        assert_eq!(settings.rotation_sensitivity(), 0.01);
    }

    #[test]
    fn left_drag_orbits() {
        let controller = OrbitController::default();
        let mut camera = orbit_camera();
        let input = drag(Vec2::new(-20.0, 10.0)).with_button(crate::input::MouseButton::LEFT);
        controller.update(&mut camera, &input);
        let orbit = camera.as_3d().unwrap().orbit();
        assert!((orbit.azimuth - 10.0).abs() < 1e-3);
        assert!((orbit.elevation - 5.0).abs() < 1e-3);
        assert!((orbit.distance - 5.0).abs() < 1e-4);
    }

    #[test]
    fn elevation_is_clamped() {
        let controller = OrbitController::default();
        let mut camera = orbit_camera();
        camera.as_3d_mut().unwrap().set_orbit(0.0, 85.0, 5.0);
        let input = drag(Vec2::new(0.0, 20.0)).with_button(crate::input::MouseButton::LEFT);
        controller.update(&mut camera, &input);
        let orbit = camera.as_3d().unwrap().orbit();
        assert!((orbit.elevation - 89.0).abs() < 1e-3, "{orbit:?}");
    }

    #[test]
    fn right_drag_pans_in_ground_plane() {
        let controller = OrbitController::default();
        let mut camera = orbit_camera();
        camera.as_3d_mut().unwrap().set_orbit(0.0, 45.0, 5.0);
        let input = drag(Vec2::new(100.0, 0.0)).with_button(crate::input::MouseButton::RIGHT);
        controller.update(&mut camera, &input);
        let camera = camera.as_3d().unwrap();
        // Dragging right moves the camera toward -X, never off the ground plane.
        assert!((camera.target() - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-4);

        let mut other = orbit_camera();
        other.as_3d_mut().unwrap().set_orbit(0.0, 45.0, 5.0);
        let input = drag(Vec2::new(0.0, 100.0)).with_button(crate::input::MouseButton::RIGHT);
        controller.update(&mut other, &input);
        // Forward is -Z, so dragging down moves the camera toward +Z.
        assert!((other.as_3d().unwrap().target() - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-4);
    }

    #[test]
    fn middle_drag_follows_up_axis() {
        let controller = OrbitController::default();
        let mut camera = orbit_camera();
        let input = drag(Vec2::new(0.0, 50.0)).with_button(crate::input::MouseButton::MIDDLE);
        controller.update(&mut camera, &input);
        assert!((camera.as_3d().unwrap().target() - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);

        let mut z_up = orbit_camera();
        z_up.as_3d_mut().unwrap().set_up_axis(UpAxis::Z);
        controller.update(&mut z_up, &input);
        assert!((z_up.as_3d().unwrap().target() - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn scroll_dollies_with_clamp() {
        let controller = OrbitController::default();
        let mut camera = orbit_camera();
        let input = InputFrame {
            scroll: Vec2::new(0.0, 10.0),
            ..InputFrame::default()
        };
        controller.update(&mut camera, &input);
        // 5 - 10 * 0.1 * 5 * 0.1 = 4.5
        assert!((camera.as_3d().unwrap().distance() - 4.5).abs() < 1e-4);

        let huge = InputFrame {
            scroll: Vec2::new(0.0, 1000.0),
            ..InputFrame::default()
        };
        controller.update(&mut camera, &huge);
        assert!((camera.as_3d().unwrap().distance() - MIN_DOLLY_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn disabled_controller_ignores_input() {
        let mut controller = OrbitController::default();
        controller.set_enabled(false);
        let mut camera = orbit_camera();
        let before = camera.clone();
        let input = drag(Vec2::new(30.0, 30.0)).with_button(crate::input::MouseButton::LEFT);
        controller.update(&mut camera, &input);
        assert_eq!(camera, before);
    }

    #[test]
    fn flat_pan_follows_rotation_and_zoom() {
        let controller = OrbitController::default();
        let mut camera = Camera::new(CameraMode::Flat, Viewport::default());
        if let Some(flat) = camera.as_2d_mut() {
            flat.set_rotation(90.0);
            flat.set_zoom(2.0);
        }

        let pan = drag(Vec2::new(10.0, 20.0)).with_button(crate::input::MouseButton::RIGHT);
        controller.update(&mut camera, &pan);
        // Screen right is world +Y and screen up is world -X at 90 degrees;
        // the step is pan sensitivity over zoom.
        let position = camera.as_2d().unwrap().position();
        assert!((position - Vec2::new(-0.1, -0.05)).length() < 1e-5, "{position:?}");
    }

    #[test]
    fn flat_camera_rotates_pans_and_zooms() {
        let controller = OrbitController::default();
        let mut camera = Camera::new(CameraMode::Flat, Viewport::default());

        let rotate = drag(Vec2::new(20.0, 0.0)).with_button(crate::input::MouseButton::LEFT);
        controller.update(&mut camera, &rotate);
        assert!((camera.as_2d().unwrap().rotation() - 350.0).abs() < 1e-4);

        let mut camera = Camera::new(CameraMode::Flat, Viewport::default());
        let pan = drag(Vec2::new(10.0, 20.0)).with_button(crate::input::MouseButton::MIDDLE);
        controller.update(&mut camera, &pan);
        let position = camera.as_2d().unwrap().position();
        assert!((position - Vec2::new(-0.1, 0.2)).length() < 1e-6);

        let zoom = InputFrame {
            scroll: Vec2::new(0.0, 1.0),
            ..InputFrame::default()
        };
        controller.update(&mut camera, &zoom);
        assert!((camera.as_2d().unwrap().zoom() - 1.1).abs() < 1e-6);

        let far = InputFrame {
            scroll: Vec2::new(0.0, -50.0),
            ..InputFrame::default()
        };
        controller.update(&mut camera, &far);
        assert_eq!(camera.as_2d().unwrap().zoom(), MIN_FLAT_ZOOM);
    }
}
