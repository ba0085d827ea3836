// Transform utilities for Mat4
//
// Scene placement uses a stack of object-to-world matrices. Every edit
// right-multiplies the top, so the newest operation is applied to geometry
// first.

use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::Aabb;

/// Errors raised by transform stack operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("cannot pop the root transform")]
    PopRoot,

    #[error("rotation axis has zero length")]
    ZeroAxis,
}

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let (lo, hi) = aabb.corners();
        Aabb::enclosing((0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            self.transform_point3(corner)
        }))
    }
}

/// Nested object-to-world transforms with push/pop scoping.
///
/// The stack always holds at least the root transform.
#[derive(Debug, Clone)]
pub struct TransformStack {
    stack: Vec<Mat4>,
}

impl TransformStack {
    /// Create a stack holding only the identity.
    pub fn new() -> Self {
        Self {
            stack: vec![Mat4::IDENTITY],
        }
    }

    /// The current object-to-world transform.
    pub fn top(&self) -> Mat4 {
        // never empty: `pop` refuses to remove the root
        self.stack[self.stack.len() - 1]
    }

    /// Number of entries, including the root.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Duplicate the top.
    pub fn push(&mut self) {
        let top = self.top();
        self.stack.push(top);
    }

    /// Remove the top. The root cannot be popped.
    pub fn pop(&mut self) -> Result<(), TransformError> {
        if self.stack.len() == 1 {
            return Err(TransformError::PopRoot);
        }
        self.stack.pop();
        Ok(())
    }

    /// Replace the top with `top * op`.
    pub fn apply(&mut self, op: Mat4) {
        let last = self.stack.len() - 1;
        self.stack[last] *= op;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.apply(Mat4::from_translation(offset));
    }

    /// Rotate about `axis` by `degrees`.
    pub fn rotate(&mut self, axis: Vec3, degrees: f32) -> Result<(), TransformError> {
        let axis = axis.try_normalize().ok_or(TransformError::ZeroAxis)?;
        self.apply(Mat4::from_axis_angle(axis, degrees.to_radians()));
        Ok(())
    }

    pub fn scale(&mut self, factors: Vec3) {
        self.apply(Mat4::from_scale(factors));
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}
