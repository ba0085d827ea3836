//! Pinhole camera derivation.
//!
//! The scene file stores an eye point, a look-at point, an up vector and a
//! vertical field of view. Rendering only needs the image plane expressed as
//! a top-left corner plus one step vector per pixel along each image axis.

use lumen_math::Vec3;
use thiserror::Error;

/// Errors raised while deriving the image plane.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera origin and look-at point coincide")]
    ZeroLookDirection,

    #[error("camera up vector is zero or parallel to the look direction")]
    DegenerateUp,

    #[error("field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f32),

    #[error("image size {0}x{1} has no pixels")]
    EmptyImage(u32, u32),
}

/// Camera parameters exactly as declared by the `camera` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSpec {
    pub origin: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
}

/// Derived camera: the image plane at unit distance in front of the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub image_plane_top_left: Vec3,
    pub pixel_right: Vec3,
    pub pixel_down: Vec3,
}

impl Camera {
    /// Derive the image plane for a `width` x `height` image.
    pub fn derive(spec: &CameraSpec, width: u32, height: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::EmptyImage(width, height));
        }
        if !(spec.fov_y > 0.0 && spec.fov_y < 180.0) {
            return Err(CameraError::InvalidFov(spec.fov_y));
        }

        let w = (spec.look_at - spec.origin)
            .try_normalize()
            .ok_or(CameraError::ZeroLookDirection)?;
        let u = w.cross(spec.up).try_normalize().ok_or(CameraError::DegenerateUp)?;
        let v = u.cross(w);

        let aspect = width as f32 / height as f32;
        let half_height = (spec.fov_y.to_radians() / 2.0).tan();
        let half_width = half_height * aspect;

        Ok(Self {
            origin: spec.origin,
            image_plane_top_left: spec.origin + w - u * half_width + v * half_height,
            pixel_right: u * (2.0 * half_width / width as f32),
            pixel_down: -v * (2.0 * half_height / height as f32),
        })
    }

    /// Normalized direction through the center of pixel (x, y).
    pub fn primary_direction(&self, x: u32, y: u32) -> Vec3 {
        let target = self.image_plane_top_left
            + (x as f32 + 0.5) * self.pixel_right
            + (y as f32 + 0.5) * self.pixel_down;
        (target - self.origin).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> CameraSpec {
        CameraSpec {
            origin: Vec3::new(0.0, 0.0, 5.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 90.0,
        }
    }

    #[test]
    fn test_basis_is_right_handed_orthonormal() {
        let camera = Camera::derive(&spec(), 640, 480).unwrap();
        let right = camera.pixel_right.normalize();
        let up = -camera.pixel_down.normalize();
        let forward = up.cross(right);

        assert!(right.dot(up).abs() < 1e-5);
        assert!(right.dot(forward).abs() < 1e-5);
        // right x up = -look
        assert!((right.cross(up) + forward).length() < 1e-5);
        assert!((forward - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_center_pixel_looks_forward() {
        // Odd sizes put a pixel center on the optical axis
        let camera = Camera::derive(&spec(), 101, 101).unwrap();
        let dir = camera.primary_direction(50, 50);
        assert!((dir - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_corner_rays_span_fov() {
        let camera = Camera::derive(&spec(), 2, 1).unwrap();
        // 90 degree vertical fov, aspect 2: plane spans [-2, 2] x [-1, 1]
        assert!((camera.image_plane_top_left - Vec3::new(-2.0, 1.0, 4.0)).length() < 1e-5);
        assert!((camera.pixel_right - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!((camera.pixel_down - Vec3::new(0.0, -2.0, 0.0)).length() < 1e-5);

        let left = camera.primary_direction(0, 0);
        assert!(left.x < 0.0 && left.z < 0.0);
    }

    #[test]
    fn test_degenerate_cameras() {
        let mut s = spec();
        s.look_at = s.origin;
        assert_eq!(Camera::derive(&s, 10, 10), Err(CameraError::ZeroLookDirection));

        let mut s = spec();
        s.up = Vec3::Z;
        assert_eq!(Camera::derive(&s, 10, 10), Err(CameraError::DegenerateUp));

        let mut s = spec();
        s.fov_y = 0.0;
        assert_eq!(Camera::derive(&s, 10, 10), Err(CameraError::InvalidFov(0.0)));

        assert_eq!(Camera::derive(&spec(), 0, 10), Err(CameraError::EmptyImage(0, 10)));
    }
}
