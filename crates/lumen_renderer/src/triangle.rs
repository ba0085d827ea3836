//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lumen_math::{Aabb, Interval, Ray, Vec3};

use crate::hittable::Hittable;
use crate::intersector::Intersection;

/// Geometry-only triangle tagged with its primitive index.
pub struct TrianglePrimitive {
    index: u32,
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    bbox: Aabb,
}

impl TrianglePrimitive {
    pub fn new(index: u32, [v0, v1, v2]: [Vec3; 3]) -> Self {
        Self {
            index,
            v0,
            edge1: v1 - v0,
            edge2: v2 - v0,
            bbox: Aabb::enclosing([v0, v1, v2]),
        }
    }
}

impl Hittable for TrianglePrimitive {
    /// Möller-Trumbore ray-triangle intersection algorithm.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        let h = ray.direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        if !ray_t.contains(t) {
            return None;
        }

        Some(Intersection::new(t, self.index, [u, v]))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
