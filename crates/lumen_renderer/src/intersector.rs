//! Batched ray queries against the scene geometry.
//!
//! The path tracer only talks to an [`Intersector`]: it hands over a batch of
//! rays and gets back one [`Intersection`] per ray, in the same order. The
//! acceleration structure is opaque to the caller and built once per render.
//!
//! Primitive indices follow one numbering for the whole scene: triangles
//! occupy `[0, T)` in scene order and spheres follow at `[T, T + S)`.

use bytemuck::{Pod, Zeroable};
use lumen_core::{Sphere, Triangle};
use lumen_math::Ray;
use rayon::prelude::*;
use thiserror::Error;

use crate::bvh::BvhNode;
use crate::hittable::Hittable;
use crate::sphere::SpherePrimitive;
use crate::triangle::TrianglePrimitive;

/// Errors raised by an intersection backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntersectError {
    #[error("scene has {0} primitives, more than a 32-bit index can address")]
    TooManyPrimitives(usize),

    #[error("backend returned {found} results for {expected} rays")]
    ResultCount { expected: usize, found: usize },

    #[error("intersection backend failed: {0}")]
    Backend(String),
}

/// Result type for intersection operations.
pub type IntersectResult<T> = Result<T, IntersectError>;

/// Per-ray query result. A miss has a negative distance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Intersection {
    pub distance: f32,
    pub primitive_index: u32,
    /// Barycentric (u, v) for triangles, zero for spheres
    pub coordinates: [f32; 2],
}

impl Intersection {
    pub const MISS: Intersection = Intersection {
        distance: -1.0,
        primitive_index: 0,
        coordinates: [0.0; 2],
    };

    pub fn new(distance: f32, primitive_index: u32, coordinates: [f32; 2]) -> Self {
        Self {
            distance,
            primitive_index,
            coordinates,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.distance >= 0.0
    }
}

/// Query kind for a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntersectionMode {
    /// Closest hit within each ray's distance range.
    Nearest,
    /// Any hit within the range; used for shadow rays.
    Any,
}

/// A ray-scene intersection backend.
pub trait Intersector: Send + Sync {
    /// Backend-specific acceleration structure.
    type Acceleration: Send + Sync;

    /// Build the acceleration structure over all scene primitives.
    fn build(&self, triangles: &[Triangle], spheres: &[Sphere])
        -> IntersectResult<Self::Acceleration>;

    /// One result per ray, in ray order.
    fn intersect(
        &self,
        rays: &[Ray],
        mode: IntersectionMode,
        acceleration: &Self::Acceleration,
    ) -> IntersectResult<Vec<Intersection>>;
}

/// CPU backend: a BVH queried in parallel with rayon.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuIntersector;

impl Intersector for CpuIntersector {
    type Acceleration = BvhNode;

    fn build(&self, triangles: &[Triangle], spheres: &[Sphere]) -> IntersectResult<BvhNode> {
        let total = triangles.len() + spheres.len();
        if u32::try_from(total).is_err() {
            return Err(IntersectError::TooManyPrimitives(total));
        }

        let mut objects: Vec<Box<dyn Hittable>> = Vec::with_capacity(total);
        for (index, triangle) in triangles.iter().enumerate() {
            objects.push(Box::new(TrianglePrimitive::new(index as u32, triangle.vertices)));
        }
        for (offset, sphere) in spheres.iter().enumerate() {
            let index = (triangles.len() + offset) as u32;
            objects.push(Box::new(SpherePrimitive::new(
                index,
                sphere.transform,
                sphere.inverse,
            )));
        }

        let bvh = BvhNode::new(objects);
        log::info!(
            "Built BVH: {} primitives, depth {}",
            bvh.len(),
            bvh.depth()
        );
        Ok(bvh)
    }

    fn intersect(
        &self,
        rays: &[Ray],
        mode: IntersectionMode,
        bvh: &BvhNode,
    ) -> IntersectResult<Vec<Intersection>> {
        Ok(rays
            .par_iter()
            .map(|ray| {
                let hit = match mode {
                    IntersectionMode::Nearest => bvh.hit(ray, ray.interval()),
                    IntersectionMode::Any => bvh.hit_any(ray, ray.interval()),
                };
                hit.unwrap_or(Intersection::MISS)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::Material;
    use lumen_math::{Mat4, Vec3};

    fn scene() -> (Vec<Triangle>, Vec<Sphere>) {
        let triangles = vec![Triangle::new(
            Vec3::new(-1.0, -1.0, -4.0),
            Vec3::new(1.0, -1.0, -4.0),
            Vec3::new(0.0, 1.0, -4.0),
            Material::default(),
        )];
        let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0))
            * Mat4::from_scale(Vec3::splat(0.5));
        let spheres = vec![Sphere::new(transform, Material::default()).unwrap()];
        (triangles, spheres)
    }

    #[test]
    fn test_intersection_layout() {
        assert_eq!(std::mem::size_of::<Intersection>(), 16);
        assert!(!Intersection::MISS.is_hit());
    }

    #[test]
    fn test_sphere_indices_follow_triangles() {
        let (triangles, spheres) = scene();
        let backend = CpuIntersector;
        let bvh = backend.build(&triangles, &spheres).unwrap();

        let rays = [
            Ray::new(Vec3::ZERO, -Vec3::Z),
            Ray::new(Vec3::new(0.0, -0.8, 0.0), -Vec3::Z),
            Ray::new(Vec3::ZERO, Vec3::Z),
        ];
        let hits = backend
            .intersect(&rays, IntersectionMode::Nearest, &bvh)
            .unwrap();

        assert_eq!(hits.len(), 3);
        // Sphere in front of the triangle
        assert_eq!(hits[0].primitive_index, 1);
        assert!((hits[0].distance - 1.5).abs() < 1e-4);
        // Below the sphere, only the triangle
        assert_eq!(hits[1].primitive_index, 0);
        assert!((hits[1].distance - 4.0).abs() < 1e-4);
        assert!(!hits[2].is_hit());
    }

    #[test]
    fn test_any_hit_respects_segment() {
        let (triangles, spheres) = scene();
        let backend = CpuIntersector;
        let bvh = backend.build(&triangles, &spheres).unwrap();

        let rays = [
            Ray::segment(Vec3::new(0.0, -0.8, 0.0), Vec3::new(0.0, -0.8, -3.0)),
            Ray::segment(Vec3::new(0.0, -0.8, 0.0), Vec3::new(0.0, -0.8, -5.0)),
        ];
        let hits = backend.intersect(&rays, IntersectionMode::Any, &bvh).unwrap();

        assert!(!hits[0].is_hit());
        assert!(hits[1].is_hit());
    }
}
