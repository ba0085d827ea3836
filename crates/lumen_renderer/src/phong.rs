//! Modified Phong reflection model.
//!
//! `f = kd / pi + ks * (s + 2) / 2pi * max(0, r . wi)^s` with `r` the mirror
//! direction of `wo`. Sampling picks the specular lobe with probability
//! `t = avg(ks) / (avg(kd) + avg(ks))` and weights by the mixture pdf.

use std::f32::consts::PI;

use lumen_math::{Color, Vec3};
use rand::{Rng, RngCore};

use crate::shader::{
    reflect, sample_cosine_hemisphere, sample_power_cosine, specular_weight, ScatterSample,
    Shader, SurfaceHit,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct PhongShader;

impl PhongShader {
    fn pdf(t: f32, shininess: f32, normal: Vec3, mirror: Vec3, wi: Vec3) -> f32 {
        let cos_theta = normal.dot(wi).max(0.0);
        (1.0 - t) * cos_theta / PI
            + t * (shininess + 1.0) / (2.0 * PI) * Self::lobe(mirror, wi, shininess)
    }

    /// `max(0, r . wi)^s`, zero behind the mirror direction even when `s = 0`.
    fn lobe(mirror: Vec3, wi: Vec3, shininess: f32) -> f32 {
        let cos_alpha = mirror.dot(wi);
        if cos_alpha <= 0.0 {
            return 0.0;
        }
        cos_alpha.powf(shininess)
    }
}

impl Shader for PhongShader {
    fn evaluate(&self, hit: &SurfaceHit<'_>, wo: Vec3, wi: Vec3) -> Color {
        let material = hit.material;
        if hit.normal.dot(wi) <= 0.0 {
            return Color::ZERO;
        }

        let mirror = reflect(-wo, hit.normal);
        let s = material.shininess;
        let lobe = Self::lobe(mirror, wi, s);

        material.diffuse / PI + material.specular * ((s + 2.0) / (2.0 * PI) * lobe)
    }

    fn sample(
        &self,
        hit: &SurfaceHit<'_>,
        wo: Vec3,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterSample> {
        let t = specular_weight(hit.material)?;
        let mirror = reflect(-wo, hit.normal);
        let s = hit.material.shininess;

        let wi = if rng.gen::<f32>() < t {
            sample_power_cosine(mirror, s, rng)
        } else {
            sample_cosine_hemisphere(hit.normal, rng)
        };

        let cos_theta = hit.normal.dot(wi);
        let pdf = Self::pdf(t, s, hit.normal, mirror, wi);
        if cos_theta <= 0.0 || pdf <= 0.0 {
            return None;
        }

        Some(ScatterSample {
            direction: wi,
            throughput: self.evaluate(hit, wo, wi) * (cos_theta / pdf),
        })
    }
}
