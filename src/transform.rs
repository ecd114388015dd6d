//! Matrix builders shared by the cameras and the batch merger.
//!
//! All builders return `glam` column-major matrices. The formulas are written
//! out explicitly (rather than delegating to `Mat4::look_at_rh` and friends)
//! because the cameras need to detect degenerate inputs and because the
//! row/sign conventions have to stay fixed for shader compatibility.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Vectors shorter than this are treated as degenerate.
pub const DEGENERATE_LENGTH: f32 = 1e-6;

/// Right-handed look-at view matrix.
///
/// Returns `None` when `eye == target` or when `up` is parallel to the
/// viewing direction, so callers can keep their previous basis.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Option<Mat4> {
    let forward = target - eye;
    let forward_len = forward.length();
    if forward_len <= DEGENERATE_LENGTH {
        return None;
    }
    let forward = forward / forward_len;

    let right = forward.cross(up);
    let right_len = right.length();
    if right_len <= DEGENERATE_LENGTH {
        return None;
    }
    let right = right / right_len;
    let up = right.cross(forward);

    Some(Mat4::from_cols(
        Vec4::new(right.x, up.x, -forward.x, 0.0),
        Vec4::new(right.y, up.y, -forward.y, 0.0),
        Vec4::new(right.z, up.z, -forward.z, 0.0),
        Vec4::new(-right.dot(eye), -up.dot(eye), forward.dot(eye), 1.0),
    ))
}

/// OpenGL-style perspective projection (clip depth in `[-1, 1]`).
pub fn perspective(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov_deg.to_radians() / 2.0).tan();
    Mat4::from_cols(
        Vec4::new(f / aspect, 0.0, 0.0, 0.0),
        Vec4::new(0.0, f, 0.0, 0.0),
        Vec4::new(0.0, 0.0, (far + near) / (near - far), -1.0),
        Vec4::new(0.0, 0.0, (2.0 * far * near) / (near - far), 0.0),
    )
}

/// Symmetric-or-not orthographic projection (clip depth in `[-1, 1]`).
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / (top - bottom), 0.0, 0.0),
        Vec4::new(0.0, 0.0, -2.0 / (far - near), 0.0),
        Vec4::new(
            -(right + left) / (right - left),
            -(top + bottom) / (top - bottom),
            -(far + near) / (far - near),
            1.0,
        ),
    )
}

/// 2D camera view: rotate by `rotation_deg`, then translate by `-R * position`.
pub fn view_2d(position: glam::Vec2, rotation_deg: f32) -> Mat4 {
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    Mat4::from_cols(
        Vec4::new(cos, -sin, 0.0, 0.0),
        Vec4::new(sin, cos, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(
            -(cos * position.x + sin * position.y),
            -(-sin * position.x + cos * position.y),
            0.0,
            1.0,
        ),
    )
}

/// Unit direction for an orbit angle pair.
///
/// Azimuth rotates about +Y starting from +Z; elevation tilts toward +Y.
pub fn spherical_to_cartesian(azimuth_deg: f32, elevation_deg: f32) -> Vec3 {
    let (sin_az, cos_az) = azimuth_deg.to_radians().sin_cos();
    let (sin_el, cos_el) = elevation_deg.to_radians().sin_cos();
    Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az)
}

/// Applies `matrix` to a point as a homogeneous transform with `w = 1`.
///
/// The result is divided by the resulting `w`, so projective matrices work
/// too. A `w` of zero leaves the undivided coordinates in place.
pub fn transform_point(matrix: &Mat4, point: Vec3) -> Vec3 {
    let transformed = *matrix * point.extend(1.0);
    if transformed.w.abs() <= f32::EPSILON {
        transformed.truncate()
    } else {
        transformed.truncate() / transformed.w
    }
}

/// Row-major copy of `matrix`; `rows[r][c]` is row `r`, column `c`.
pub fn to_row_major(matrix: &Mat4) -> [[f32; 4]; 4] {
    matrix.transpose().to_cols_array_2d()
}

/// Translation / Euler rotation / scale of one drawn instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees, applied X then Y then Z.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl ModelTransform {
    pub fn matrix(&self) -> Mat4 {
        let translation = Mat4::from_translation(self.position);
        let rotation = Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_x(self.rotation.x.to_radians());
        let scale = Mat4::from_scale(self.scale);
        translation * rotation * scale
    }
}

/// Framebuffer size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; a zero height reports `1.0`.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn assert_mat_close(a: &Mat4, b: &Mat4) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn look_at_matches_right_handed_convention() {
        let eye = Vec3::new(1.0, 2.0, 5.0);
        let target = Vec3::new(0.0, 0.5, 0.0);
        let view = look_at(eye, target, Vec3::Y).unwrap();
        assert_mat_close(&view, &Mat4::look_at_rh(eye, target, Vec3::Y));
    }

    #[test]
    fn look_at_rows_follow_documented_layout() {
        let view = look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        let rows = to_row_major(&view);
        assert_eq!(rows[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(rows[1], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(rows[2], [0.0, 0.0, 1.0, -5.0]);
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn degenerate_look_at_is_rejected() {
        assert!(look_at(Vec3::ONE, Vec3::ONE, Vec3::Y).is_none());
        assert!(look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y).is_none());
    }

    #[test]
    fn perspective_square_aspect() {
        let projection = perspective(90.0, 1.0, 0.1, 100.0);
        let rows = to_row_major(&projection);
        assert!((rows[0][0] - rows[1][1]).abs() < 1e-6);
        assert!((rows[0][0] - 1.0).abs() < 1e-5);
        assert_eq!(rows[3][2], -1.0);
        assert_mat_close(
            &projection,
            &Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.1, 100.0),
        );
    }

    #[test]
    fn orthographic_matches_gl_convention() {
        let ortho = orthographic(-2.0, 2.0, -1.0, 1.0, -10.0, 10.0);
        assert_mat_close(
            &ortho,
            &Mat4::orthographic_rh_gl(-2.0, 2.0, -1.0, 1.0, -10.0, 10.0),
        );
    }

    #[test]
    fn view_2d_rotates_pan_direction() {
        let view = view_2d(Vec2::new(1.0, 0.0), 90.0);
        // The camera position itself must land on the view-space origin.
        let origin = transform_point(&view, Vec3::new(1.0, 0.0, 0.0));
        assert!(origin.length() < 1e-5);
        let rows = to_row_major(&view);
        assert!((rows[0][1] - 1.0).abs() < 1e-6);
        assert!((rows[1][0] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn spherical_axes() {
        assert!((spherical_to_cartesian(0.0, 0.0) - Vec3::Z).length() < 1e-6);
        assert!((spherical_to_cartesian(90.0, 0.0) - Vec3::X).length() < 1e-6);
        assert!((spherical_to_cartesian(0.0, 90.0) - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn transform_point_divides_by_w() {
        let mut projective = Mat4::IDENTITY;
        projective.w_axis.w = 2.0;
        let point = transform_point(&projective, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(point, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn model_transform_composes_trs() {
        let transform = ModelTransform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::new(0.0, 0.0, 90.0),
            scale: Vec3::splat(2.0),
        };
        let point = transform_point(&transform.matrix(), Vec3::X);
        assert!((point - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn viewport_guards_zero_height() {
        assert_eq!(Viewport::new(800, 0).aspect(), 1.0);
        assert!((Viewport::new(800, 400).aspect() - 2.0).abs() < f32::EPSILON);
    }
}
