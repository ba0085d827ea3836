// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::{Mat4Ext, TransformError, TransformStack};

/// Color type alias (linear RGB radiance, unbounded).
pub type Color = Vec3;
