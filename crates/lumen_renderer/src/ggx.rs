//! GGX microfacet reflection with a Lambertian base.
//!
//! `f = kd / pi + F * D * G / (4 cos_i cos_o)` with Schlick Fresnel on `ks`,
//! the Trowbridge-Reitz distribution and separable Smith shadowing. Material
//! roughness maps to `alpha = roughness^2`.

use std::f32::consts::PI;

use lumen_core::Material;
use lumen_math::{Color, Vec3};
use rand::{Rng, RngCore};

use crate::shader::{
    around, reflect, sample_cosine_hemisphere, specular_weight, ScatterSample, Shader,
    SurfaceHit,
};

/// Lower bound on alpha; a perfect mirror would make D a delta.
const MIN_ALPHA: f32 = 0.001;

#[derive(Debug, Clone, Copy, Default)]
pub struct GgxShader;

fn alpha(material: &Material) -> f32 {
    (material.roughness * material.roughness).max(MIN_ALPHA)
}

/// Schlick weight for Fresnel.
#[inline]
fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x // (1 - cos_theta)^5
}

/// Schlick Fresnel approximation.
#[inline]
fn schlick_fresnel3(f0: Color, cos_theta: f32) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// GGX/Trowbridge-Reitz distribution.
#[inline]
fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Smith G for GGX.
#[inline]
fn smith_g_ggx(n_dot_l: f32, n_dot_v: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let g1_l = 2.0 * n_dot_l / (n_dot_l + (a2 + (1.0 - a2) * n_dot_l * n_dot_l).sqrt());
    let g1_v = 2.0 * n_dot_v / (n_dot_v + (a2 + (1.0 - a2) * n_dot_v * n_dot_v).sqrt());
    g1_l * g1_v
}

impl GgxShader {
    fn pdf(t: f32, alpha: f32, normal: Vec3, wo: Vec3, wi: Vec3) -> f32 {
        let cos_theta = normal.dot(wi).max(0.0);
        let diffuse = (1.0 - t) * cos_theta / PI;

        let h = (wo + wi).normalize_or_zero();
        let h_dot_wi = h.dot(wi);
        if h_dot_wi <= 0.0 {
            return diffuse;
        }
        let n_dot_h = normal.dot(h).max(0.0);
        diffuse + t * ggx_d(n_dot_h, alpha) * n_dot_h / (4.0 * h_dot_wi)
    }

    /// Half vector distributed as `D(h) cos_h` around `n`.
    fn sample_half_vector(n: Vec3, alpha: f32, rng: &mut dyn RngCore) -> Vec3 {
        let u1: f32 = rng.gen();
        let u2: f32 = rng.gen();
        let theta = (alpha * u1.sqrt() / (1.0 - u1).sqrt()).atan();
        around(n, theta.cos(), 2.0 * PI * u2)
    }
}

impl Shader for GgxShader {
    fn evaluate(&self, hit: &SurfaceHit<'_>, wo: Vec3, wi: Vec3) -> Color {
        let material = hit.material;
        let n = hit.normal;
        let n_dot_l = n.dot(wi);
        let n_dot_v = n.dot(wo);
        if n_dot_l <= 0.0 || n_dot_v <= 0.0 {
            return Color::ZERO;
        }

        let diffuse = material.diffuse / PI;
        if material.specular.max_element() <= 0.0 {
            return diffuse;
        }

        let alpha = alpha(material);
        let h = (wo + wi).normalize();
        let d = ggx_d(n.dot(h).max(0.0), alpha);
        let g = smith_g_ggx(n_dot_l, n_dot_v, alpha);
        let f = schlick_fresnel3(material.specular, wi.dot(h).max(0.0));

        diffuse + f * (d * g / (4.0 * n_dot_l * n_dot_v))
    }

    fn sample(
        &self,
        hit: &SurfaceHit<'_>,
        wo: Vec3,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterSample> {
        let t = specular_weight(hit.material)?;
        let alpha = alpha(hit.material);

        let wi = if rng.gen::<f32>() < t {
            let h = Self::sample_half_vector(hit.normal, alpha, rng);
            reflect(-wo, h)
        } else {
            sample_cosine_hemisphere(hit.normal, rng)
        };

        let cos_theta = hit.normal.dot(wi);
        let pdf = Self::pdf(t, alpha, hit.normal, wo, wi);
        if cos_theta <= 0.0 || pdf <= 0.0 {
            return None;
        }

        Some(ScatterSample {
            direction: wi,
            throughput: self.evaluate(hit, wo, wi) * (cos_theta / pdf),
        })
    }
}
