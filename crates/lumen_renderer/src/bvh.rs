//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Uses a binary tree structure for efficient ray-scene intersection testing.

use lumen_math::{Aabb, Interval, Ray};

use crate::hittable::{hit_nearest, Hittable};
use crate::intersector::Intersection;

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with primitives.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of primitives.
    Leaf {
        objects: Vec<Box<dyn Hittable>>,
        bbox: Aabb,
    },
    /// A scene without primitives.
    Empty,
}

impl BvhNode {
    /// Create a BVH from a list of hittable objects.
    pub fn new(objects: Vec<Box<dyn Hittable>>) -> Self {
        if objects.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(objects)
    }

    /// Recursive median-split construction: sort by centroid on the axis of
    /// widest centroid spread, split in half, recurse.
    fn build(mut objects: Vec<Box<dyn Hittable>>) -> Self {
        let n = objects.len();
        let bounds = objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| Aabb::surrounding(&acc, &o.bounding_box()));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                objects,
                bbox: bounds,
            };
        }

        let axis = Aabb::enclosing(objects.iter().map(|o| o.bounding_box().centroid()))
            .longest_axis();

        objects.sort_unstable_by(|a, b| {
            let a_val = a.bounding_box().centroid()[axis];
            let b_val = b.bounding_box().centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        let right_objects = objects.split_off(n / 2);
        let left = Self::build(objects);
        let right = Self::build(right_objects);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Number of primitives stored in the tree.
    pub fn len(&self) -> usize {
        match self {
            BvhNode::Empty => 0,
            BvhNode::Leaf { objects, .. } => objects.len(),
            BvhNode::Branch { left, right, .. } => left.len() + right.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BvhNode::Empty)
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        match self {
            BvhNode::Empty => 0,
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

impl Hittable for BvhNode {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        match self {
            BvhNode::Empty => None,

            BvhNode::Leaf { objects, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }
                hit_nearest(objects, ray, ray_t)
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let hit_left = left.hit(ray, ray_t);

                // Only check right up to closest hit
                let right_t = match &hit_left {
                    Some(hit) => ray_t.with_max(hit.distance),
                    None => ray_t,
                };
                right.hit(ray, right_t).or(hit_left)
            }
        }
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> Option<Intersection> {
        match self {
            BvhNode::Empty => None,

            BvhNode::Leaf { objects, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }
                objects.iter().find_map(|o| o.hit(ray, ray_t))
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }
                left.hit_any(ray, ray_t).or_else(|| right.hit_any(ray, ray_t))
            }
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}
