//! Sphere primitive for ray tracing.
//!
//! Spheres are unit spheres placed by an affine transform. Rays are moved into
//! the unit sphere's space instead of transforming the sphere, which keeps
//! ellipsoids (non-uniform scale) exact. The direction is not renormalized, so
//! the root is already the world-space distance. Spheres report no surface
//! coordinates; the shading normal comes from the scene's `Sphere`.

use lumen_math::{Aabb, Interval, Mat4, Mat4Ext, Ray, Vec3};

use crate::hittable::Hittable;
use crate::intersector::Intersection;

pub struct SpherePrimitive {
    index: u32,
    inverse: Mat4,
    bbox: Aabb,
}

impl SpherePrimitive {
    pub fn new(index: u32, transform: Mat4, inverse: Mat4) -> Self {
        let unit = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        Self {
            index,
            inverse,
            bbox: transform.transform_aabb(&unit),
        }
    }
}

impl Hittable for SpherePrimitive {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        let origin = self.inverse.transform_point3(ray.origin);
        let direction = self.inverse.transform_vector3(ray.direction);

        let a = direction.length_squared();
        let h = -direction.dot(origin);
        let c = origin.length_squared() - 1.0;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        Some(Intersection::new(root, self.index, [0.0; 2]))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
