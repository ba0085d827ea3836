//! Hittable trait for ray-primitive intersection.

use lumen_math::{Aabb, Interval, Ray};

use crate::intersector::Intersection;

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Nearest hit of `ray` within `ray_t`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection>;

    /// Any hit of `ray` within `ray_t`. Containers override this to stop at
    /// the first primitive they find.
    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        self.hit(ray, ray_t)
    }

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

/// Nearest hit over a list of objects.
pub(crate) fn hit_nearest<'a, I>(objects: I, ray: &Ray, ray_t: Interval) -> Option<Intersection>
where
    I: IntoIterator<Item = &'a Box<dyn Hittable>>,
{
    let mut closest: Option<Intersection> = None;
    for object in objects {
        let interval = match &closest {
            Some(hit) => ray_t.with_max(hit.distance),
            None => ray_t,
        };
        if let Some(hit) = object.hit(ray, interval) {
            closest = Some(hit);
        }
    }
    closest
}
