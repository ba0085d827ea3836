//! Shader trait: BRDF evaluation and importance sampling.
//!
//! Shading is split in two calls. `evaluate` returns the BRDF value for a
//! fixed pair of directions and is used by next event estimation. `sample`
//! draws a continuation direction and returns the throughput multiplier
//! `f * cos / pdf` for that direction. Emission is not part of the shader; the
//! path tracer reads it from the material directly.
//!
//! Directions are unit vectors pointing away from the surface: `wo` toward
//! the previous vertex, `wi` toward the next one.

use std::f32::consts::PI;

use lumen_core::{BrdfKind, Material};
use lumen_math::{Color, Vec3};
use rand::{Rng, RngCore};

use crate::ggx::GgxShader;
use crate::phong::PhongShader;

/// Shading point as seen by a shader.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit<'a> {
    pub position: Vec3,
    /// Unit normal on the side of `wo`
    pub normal: Vec3,
    pub material: &'a Material,
}

/// Result of sampling a continuation direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSample {
    pub direction: Vec3,
    /// `f * cos / pdf`
    pub throughput: Color,
}

/// Trait for surface reflection models.
pub trait Shader: Send + Sync {
    /// BRDF value for light arriving along `wi` and leaving along `wo`.
    fn evaluate(&self, hit: &SurfaceHit<'_>, wo: Vec3, wi: Vec3) -> Color;

    /// Sample a continuation direction. `None` ends the path.
    fn sample(&self, hit: &SurfaceHit<'_>, wo: Vec3, rng: &mut dyn RngCore)
        -> Option<ScatterSample>;
}

/// Shader for the model selected in the scene file.
pub fn shader_for(kind: BrdfKind) -> Box<dyn Shader> {
    match kind {
        BrdfKind::Phong => Box::new(PhongShader),
        BrdfKind::Ggx => Box::new(GgxShader),
    }
}

// =============================================================================
// Sampling helpers
// =============================================================================

/// Average of the three channels.
#[inline]
pub(crate) fn average(c: Color) -> f32 {
    (c.x + c.y + c.z) / 3.0
}

/// Mirror `v` about `n`.
#[inline]
pub(crate) fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Probability of picking the specular lobe.
pub(crate) fn specular_weight(material: &Material) -> Option<f32> {
    let kd = average(material.diffuse);
    let ks = average(material.specular);
    if kd + ks <= 0.0 {
        return None;
    }
    Some(ks / (kd + ks))
}

/// Build an orthonormal basis from a unit vector.
pub(crate) fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

/// Direction at polar angle `cos_theta` and azimuth `phi` around `axis`.
pub(crate) fn around(axis: Vec3, cos_theta: f32, phi: f32) -> Vec3 {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let (tangent, bitangent) = orthonormal_basis(axis);
    (tangent * (sin_theta * phi.cos()) + bitangent * (sin_theta * phi.sin()) + axis * cos_theta)
        .normalize()
}

/// Cosine-weighted direction in the hemisphere around `n`. pdf = cos / pi.
pub(crate) fn sample_cosine_hemisphere(n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let u1: f32 = rng.gen();
    let u2: f32 = rng.gen();
    around(n, u1.sqrt(), 2.0 * PI * u2)
}

/// Direction distributed as `cos^s` around `axis`. pdf = (s + 1) / 2pi cos^s.
pub(crate) fn sample_power_cosine(axis: Vec3, exponent: f32, rng: &mut dyn RngCore) -> Vec3 {
    let u1: f32 = rng.gen();
    let u2: f32 = rng.gen();
    around(axis, u1.powf(1.0 / (exponent + 1.0)), 2.0 * PI * u2)
}
