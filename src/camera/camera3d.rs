use glam::{Mat4, Vec3};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{CameraMode, CameraView, UpAxis};
use crate::transform::{self, Viewport};

const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);
const DEFAULT_TARGET: Vec3 = Vec3::ZERO;
const DEFAULT_FOV: f32 = 45.0;
/// Below this eye-target distance the orbit angles are undefined.
const MIN_ORBIT_DISTANCE: f32 = 1e-3;
/// View directions closer than this to the up axis count as parallel.
const AXIS_ALIGNED_DOT: f32 = 0.999;

/// Spherical camera placement around the target, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub azimuth: f32,
    pub elevation: f32,
    pub distance: f32,
}

/// Perspective look-at camera with orbit, pan and dolly helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera3D {
    viewport: Viewport,
    position: Vec3,
    target: Vec3,
    up: Vec3,
    up_axis: UpAxis,
    fov: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera3D {
    pub fn new(viewport: Viewport) -> Self {
        let mut camera = Self {
            viewport,
            position: DEFAULT_POSITION,
            target: DEFAULT_TARGET,
            up: Vec3::Y,
            up_axis: UpAxis::Y,
            fov: DEFAULT_FOV,
            near: 0.1,
            far: 100.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_view();
        camera.update_projection();
        info!("Camera3D initialized");
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.update_view();
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.up = up;
        self.update_view();
    }

    pub fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    /// Selects the world up axis and aligns the up vector with it.
    ///
    /// An eye sitting on the new axis is swung onto the ground plane at the
    /// same distance, otherwise the look-at basis would be undefined.
    pub fn set_up_axis(&mut self, axis: UpAxis) {
        self.up_axis = axis;
        self.up = axis.vector();
        let relative = self.position - self.target;
        let distance = relative.length();
        let on_axis = distance > MIN_ORBIT_DISTANCE
            && (relative / distance).dot(self.up).abs() > AXIS_ALIGNED_DOT;
        if on_axis {
            let side = match axis {
                UpAxis::Y => Vec3::Z,
                UpAxis::Z => Vec3::NEG_Y,
            };
            self.position = self.target + side * distance;
        }
        self.update_view();
    }

    /// Vertical field of view in degrees.
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = degrees.clamp(1.0, 179.0);
        self.update_projection();
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

    /// Moves eye and target by the same delta; the view direction is kept.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.target += delta;
        self.update_view();
    }

    /// Places eye and target at their defaults shifted by `offset`.
    ///
    /// Unlike [`translate`](Self::translate) this is absolute.
    pub fn set_pan(&mut self, offset: Vec3) {
        self.position = DEFAULT_POSITION + offset;
        self.target = DEFAULT_TARGET + offset;
        self.update_view();
    }

    /// Current pan offset, reported as the target position.
    pub fn pan(&self) -> Vec3 {
        self.target
    }

    /// Places the eye on a sphere around the target.
    ///
    /// Distance is taken as given; range policy belongs to the controller.
    pub fn set_orbit(&mut self, azimuth: f32, elevation: f32, distance: f32) {
        self.position =
            self.target + distance * transform::spherical_to_cartesian(azimuth, elevation);
        self.update_view();
    }

    pub fn orbit(&self) -> Orbit {
        let relative = self.position - self.target;
        let distance = relative.length();
        if distance < MIN_ORBIT_DISTANCE {
            return Orbit {
                azimuth: 0.0,
                elevation: 0.0,
                distance,
            };
        }
        let direction = relative / distance;
        Orbit {
            azimuth: direction.x.atan2(direction.z).to_degrees(),
            elevation: direction.y.clamp(-1.0, 1.0).asin().to_degrees(),
            distance,
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Moves the eye along the current target-to-eye direction.
    ///
    /// Falls back to `+Z` when the eye sits on the target.
    pub fn set_distance(&mut self, distance: f32) {
        let relative = self.position - self.target;
        let length = relative.length();
        let direction = if length > MIN_ORBIT_DISTANCE {
            relative / length
        } else {
            Vec3::Z
        };
        self.position = self.target + direction * distance;
        self.update_view();
    }

    fn update_view(&mut self) {
        match transform::look_at(self.position, self.target, self.up) {
            Some(view) => self.view = view,
            None => warn!(
                "degenerate camera basis (eye={:?}, target={:?}, up={:?}); keeping previous view",
                self.position, self.target, self.up
            ),
        }
    }

    fn update_projection(&mut self) {
        self.projection = transform::perspective(self.fov, self.aspect(), self.near, self.far);
    }
}

impl Default for Camera3D {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl CameraView for Camera3D {
    fn mode(&self) -> CameraMode {
        CameraMode::Orbit
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
        self.position = DEFAULT_POSITION;
        self.target = DEFAULT_TARGET;
        self.up = Vec3::Y;
        self.up_axis = UpAxis::Y;
        self.fov = DEFAULT_FOV;
        self.update_view();
        self.update_projection();
        info!("Camera3D reset to default");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::to_row_major;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn orbit_round_trip() {
        let mut camera = Camera3D::default();
        camera.set_target(Vec3::new(1.0, -2.0, 0.5));
        for &(azimuth, elevation, distance) in &[
            (0.0, 0.0, 5.0),
            (45.0, 30.0, 2.5),
            (-120.0, -60.0, 10.0),
            (170.0, 80.0, 0.5),
            (-179.0, -88.5, 42.0),
        ] {
            camera.set_orbit(azimuth, elevation, distance);
            let orbit = camera.orbit();
            assert!(close(orbit.azimuth, azimuth, 1e-3), "{orbit:?}");
            assert!(close(orbit.elevation, elevation, 1e-3), "{orbit:?}");
            assert!(close(orbit.distance, distance, 1e-4 * distance.max(1.0)), "{orbit:?}");
        }
    }

    #[test]
    fn orbit_of_collapsed_camera_is_zero_angles() {
        let mut camera = Camera3D::default();
        camera.set_position(Vec3::new(0.0, 0.0, 0.0005));
        let orbit = camera.orbit();
        assert_eq!(orbit.azimuth, 0.0);
        assert_eq!(orbit.elevation, 0.0);
        assert!(orbit.distance < 1e-3);
    }

    #[test]
    fn translate_preserves_view_direction() {
        let mut camera = Camera3D::default();
        camera.set_orbit(30.0, 20.0, 4.0);
        let before = camera.position() - camera.target();
        camera.translate(Vec3::new(0.5, -1.0, 2.0));
        let after = camera.position() - camera.target();
        assert!((before - after).length() < 1e-5);
        assert_eq!(camera.target(), Vec3::new(0.5, -1.0, 2.0));
    }

    #[test]
    fn set_pan_is_absolute() {
        let mut camera = Camera3D::default();
        camera.translate(Vec3::new(10.0, 0.0, 0.0));
        camera.set_pan(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 8.0));
        assert_eq!(camera.target(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.pan(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn set_distance_keeps_direction() {
        let mut camera = Camera3D::default();
        camera.set_orbit(90.0, 0.0, 2.0);
        camera.set_distance(8.0);
        assert!((camera.position() - Vec3::new(8.0, 0.0, 0.0)).length() < 1e-4);

        camera.set_position(camera.target());
        camera.set_distance(3.0);
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn fov_is_clamped() {
        let mut camera = Camera3D::default();
        camera.set_fov(0.0);
        assert_eq!(camera.fov(), 1.0);
        camera.set_fov(500.0);
        assert_eq!(camera.fov(), 179.0);
    }

    #[test]
    fn degenerate_eye_keeps_previous_view() {
        let mut camera = Camera3D::default();
        let before = camera.view_matrix();
        camera.set_position(Vec3::ZERO);
        assert_eq!(camera.view_matrix(), before);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn perspective_projection_layout() {
        let mut camera = Camera3D::new(Viewport::new(600, 600));
        camera.set_fov(90.0);
        camera.set_clip_planes(0.1, 100.0);
        let rows = to_row_major(&camera.projection_matrix());
        assert_eq!(rows[0][0], rows[1][1]);
        assert_eq!(rows[3][2], -1.0);
        assert!(close(rows[2][2], 100.1 / -99.9, 1e-5));
        assert!(close(rows[2][3], 20.0 / -99.9, 1e-5));
    }

    #[test]
    fn z_up_axis_moves_eye_off_the_axis() {
        let mut camera = Camera3D::default();
        camera.set_up_axis(UpAxis::Z);
        assert!((camera.position() - Vec3::new(0.0, -5.0, 0.0)).length() < 1e-5);
        let rows = to_row_major(&camera.view_matrix());
        assert!(close(rows[1][2], 1.0, 1e-5), "{rows:?}");
        assert!(close(rows[1][1], 0.0, 1e-5), "{rows:?}");

        // An eye already off the axis stays where it is.
        camera.set_orbit(30.0, 10.0, 4.0);
        let eye = camera.position();
        camera.set_up_axis(UpAxis::Z);
        assert_eq!(camera.position(), eye);
    }

    #[test]
    fn z_up_axis_updates_up_vector() {
        let mut camera = Camera3D::default();
        camera.set_up_axis(UpAxis::Z);
        assert_eq!(camera.up(), Vec3::Z);
        camera.reset();
        assert_eq!(camera.up_axis(), UpAxis::Y);
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.fov(), 45.0);
    }
}
