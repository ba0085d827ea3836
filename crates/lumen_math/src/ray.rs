use crate::{Interval, Vec3};

/// Distance a spawned ray keeps from the surface it leaves.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray segment with origin, direction and a valid distance range.
///
/// The layout matches the origin/min-distance/direction/max-distance packing
/// used by batched intersection backends, so a slice of rays can be handed to
/// an intersector as-is.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub min_distance: f32,
    pub direction: Vec3,
    pub max_distance: f32,
}

impl Ray {
    /// Create an unbounded ray starting at `min_distance = 0`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            min_distance: 0.0,
            direction,
            max_distance: f32::INFINITY,
        }
    }

    /// Create a ray leaving a surface point, offset to avoid self-intersection.
    pub fn spawn(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            min_distance: RAY_EPSILON,
            direction,
            max_distance: f32::INFINITY,
        }
    }

    /// Create a shadow segment from `origin` towards `target`.
    ///
    /// The direction is normalized and the segment stops just short of the
    /// target so the emitter itself does not count as an occluder.
    pub fn segment(origin: Vec3, target: Vec3) -> Self {
        let offset = target - origin;
        let length = offset.length();
        let direction = if length > 0.0 { offset / length } else { Vec3::Z };
        Self {
            origin,
            min_distance: RAY_EPSILON,
            direction,
            max_distance: (length - RAY_EPSILON).max(RAY_EPSILON),
        }
    }

    /// The valid distance range of this ray.
    #[inline]
    pub fn interval(&self) -> Interval {
        Interval::new(self.min_distance, self.max_distance)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
