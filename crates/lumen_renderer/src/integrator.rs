//! Wavefront path tracing.
//!
//! Samples are the outer loop. Within one sample every pixel owns one path
//! and all paths advance one depth at a time: a batched nearest-hit query,
//! emission, an optional batch of shadow rays for next event estimation, then
//! a bounce. Each stage runs in parallel over the active paths.
//!
//! Up to [`MAX_FRAMES_IN_FLIGHT`] samples run concurrently on scoped worker
//! threads. Sample buffers are committed in sample order, and every path's
//! random stream depends only on the render seed, the sample index and the
//! pixel, so a render is reproducible bit for bit.

use std::thread::ScopedJoinHandle;
use std::time::Instant;

use lumen_core::{Camera, FrameUniforms, Material, QuadLight, Scene, SceneUniforms};
use lumen_math::{Color, Ray, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::accumulator::{AccumulateError, FrameAccumulator};
use crate::frames::{FrameRing, InFlightFrame, InFlightLimiter, MAX_FRAMES_IN_FLIGHT};
use crate::intersector::{IntersectError, Intersection, IntersectionMode, Intersector};
use crate::shader::{shader_for, Shader, SurfaceHit};

/// Errors that abort a render. No image is produced.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("scene is incomplete: no camera was derived")]
    IncompleteScene,

    #[error("intersection failed: {0}")]
    Intersect(#[from] IntersectError),

    #[error("accumulation failed: {0}")]
    Accumulate(#[from] AccumulateError),

    #[error("worker for sample {0} panicked")]
    WorkerPanicked(u32),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Survival probability used when Russian roulette is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoulettePolicy {
    /// `min(1, max component of throughput)`
    Throughput,
    /// A constant probability in (0, 1].
    Fixed(f32),
}

impl RoulettePolicy {
    pub fn survival(&self, throughput: Color) -> f32 {
        match *self {
            RoulettePolicy::Throughput => throughput.max_element().min(1.0),
            RoulettePolicy::Fixed(p) => p.min(1.0),
        }
    }
}

/// Renderer options not carried by the scene file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Base seed for every path's random stream
    pub seed: u64,
    pub roulette: RoulettePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            roulette: RoulettePolicy::Throughput,
        }
    }
}

/// One camera path between depth iterations.
struct PathState {
    pixel: usize,
    ray: Ray,
    throughput: Color,
    rng: StdRng,
}

/// A path that has just hit a surface.
struct PathVertex<'s> {
    path: PathState,
    primitive: usize,
    position: Vec3,
    /// Unit normal facing `wo`
    normal: Vec3,
    wo: Vec3,
    material: &'s Material,
}

impl<'s> PathVertex<'s> {
    fn surface(&self) -> SurfaceHit<'s> {
        SurfaceHit {
            position: self.position,
            normal: self.normal,
            material: self.material,
        }
    }
}

/// A shadow ray and the radiance it carries if unoccluded.
struct ShadowSample {
    pixel: usize,
    ray: Ray,
    contribution: Color,
}

/// Drives the path tracing of one scene.
pub struct PathTracer<'s, I: Intersector> {
    scene: &'s Scene,
    intersector: I,
    shader: Box<dyn Shader>,
    config: RenderConfig,
    uniforms: SceneUniforms,
}

impl<'s, I: Intersector> PathTracer<'s, I> {
    /// Refuses scenes without a derived camera.
    pub fn new(scene: &'s Scene, intersector: I, config: RenderConfig) -> RenderResult<Self> {
        let uniforms = SceneUniforms::from_scene(scene).ok_or(RenderError::IncompleteScene)?;
        Ok(Self {
            scene,
            intersector,
            shader: shader_for(scene.settings.brdf),
            config,
            uniforms,
        })
    }

    /// Render every sample and return the accumulated frame.
    pub fn render(&self) -> RenderResult<FrameAccumulator> {
        let settings = &self.scene.settings;
        let start = Instant::now();
        log::info!(
            "Rendering {}x{} at {} spp, max depth {}, nee {}, russian roulette {}",
            settings.width,
            settings.height,
            settings.spp,
            settings.max_depth,
            if settings.nee { "on" } else { "off" },
            if settings.russian_roulette { "on" } else { "off" },
        );

        let acceleration = self
            .intersector
            .build(&self.scene.triangles, &self.scene.spheres)?;
        let limiter = InFlightLimiter::new(MAX_FRAMES_IN_FLIGHT);
        let mut film = FrameAccumulator::new(settings.width, settings.height);

        std::thread::scope(|scope| {
            let mut ring = FrameRing::new(MAX_FRAMES_IN_FLIGHT);
            let mut outcome = Ok(());

            for sample_index in 0..settings.spp {
                let permit = limiter.acquire();
                let uniforms = FrameUniforms::new(self.uniforms, sample_index, self.config.seed);
                let acceleration = &acceleration;
                let pending = scope.spawn(move || {
                    let _permit = permit;
                    self.trace_sample(&uniforms, acceleration)
                });

                if let Some(oldest) = ring.push(InFlightFrame { uniforms, pending }) {
                    outcome = commit(oldest, &mut film);
                    if outcome.is_err() {
                        break;
                    }
                    log::debug!(
                        "Sample {}/{} committed ({} finished)",
                        film.sample_count(),
                        settings.spp,
                        limiter.completed()
                    );
                }
            }

            while let Some(frame) = ring.retire() {
                if outcome.is_ok() {
                    outcome = commit(frame, &mut film);
                } else {
                    // Already failing; only wait for the worker
                    let _ = frame.pending.join();
                }
            }
            outcome
        })?;

        log::info!(
            "Rendered {} samples in {:.2}s",
            film.sample_count(),
            start.elapsed().as_secs_f32()
        );
        Ok(film)
    }

    /// Trace one sample for every pixel.
    fn trace_sample(
        &self,
        frame: &FrameUniforms,
        acceleration: &I::Acceleration,
    ) -> RenderResult<Vec<Color>> {
        let uniforms = &frame.scene;
        let camera = Camera::from(&uniforms.camera);
        let [width, _] = uniforms.image_size;
        let pixel_count = uniforms.image_size[0] as usize * uniforms.image_size[1] as usize;
        let seed = frame.seed();

        let mut radiance = vec![Color::ZERO; pixel_count];
        let mut paths: Vec<PathState> = (0..pixel_count)
            .into_par_iter()
            .map(|pixel| {
                let x = (pixel % width as usize) as u32;
                let y = (pixel / width as usize) as u32;
                PathState {
                    pixel,
                    ray: Ray::new(camera.origin, camera.primary_direction(x, y)),
                    throughput: Color::ONE,
                    rng: StdRng::seed_from_u64(path_seed(seed, frame.sample_index, pixel)),
                }
            })
            .collect();

        for depth in 0..uniforms.max_depth {
            if paths.is_empty() {
                break;
            }

            let rays: Vec<Ray> = paths.iter().map(|p| p.ray).collect();
            let hits = self.query(&rays, IntersectionMode::Nearest, acceleration)?;

            // Misses leave the scene and carry nothing back
            let mut vertices: Vec<PathVertex<'s>> = paths
                .into_par_iter()
                .zip(hits)
                .filter_map(|(path, hit)| self.shading_point(path, &hit))
                .collect();

            // With NEE on, a bounce that lands on quad light geometry was
            // already counted as direct light one vertex earlier
            let nee = uniforms.nee_on != 0;
            for vertex in &vertices {
                if depth > 0 && nee && self.scene.is_light_geometry(vertex.primitive) {
                    continue;
                }
                radiance[vertex.path.pixel] += vertex.path.throughput * vertex.material.emission;
            }

            if nee {
                let shadow: Vec<ShadowSample> = vertices
                    .par_iter_mut()
                    .flat_map_iter(|vertex| self.sample_lights(vertex, uniforms))
                    .collect();
                let shadow_rays: Vec<Ray> = shadow.iter().map(|s| s.ray).collect();
                let occlusion = self.query(&shadow_rays, IntersectionMode::Any, acceleration)?;
                for (sample, hit) in shadow.iter().zip(&occlusion) {
                    if !hit.is_hit() {
                        radiance[sample.pixel] += sample.contribution;
                    }
                }
            }

            paths = vertices
                .into_par_iter()
                .filter_map(|vertex| self.bounce(vertex, uniforms.rr_on != 0))
                .collect();
        }

        Ok(radiance)
    }

    /// Run one batch through the intersector.
    fn query(
        &self,
        rays: &[Ray],
        mode: IntersectionMode,
        acceleration: &I::Acceleration,
    ) -> RenderResult<Vec<Intersection>> {
        if rays.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self.intersector.intersect(rays, mode, acceleration)?;
        if hits.len() != rays.len() {
            return Err(IntersectError::ResultCount {
                expected: rays.len(),
                found: hits.len(),
            }
            .into());
        }
        Ok(hits)
    }

    /// Resolve a hit into position, facing normal and material.
    fn shading_point(&self, path: PathState, hit: &Intersection) -> Option<PathVertex<'s>> {
        if !hit.is_hit() {
            return None;
        }
        let index = hit.primitive_index as usize;
        let material = self.scene.material(index)?;
        let triangles = &self.scene.triangles;

        let (position, normal) = match triangles.get(index) {
            Some(triangle) => {
                let [u, v] = hit.coordinates;
                (triangle.point_at(u, v), triangle.normal())
            }
            None => {
                let sphere = self.scene.spheres.get(index - triangles.len())?;
                let position = path.ray.at(hit.distance);
                (position, sphere.normal_at(position))
            }
        };

        let wo = -path.ray.direction.normalize();
        let normal = if normal.dot(wo) < 0.0 { -normal } else { normal };

        Some(PathVertex {
            path,
            primitive: index,
            position,
            normal,
            wo,
            material,
        })
    }

    /// Shadow rays toward every real light, weighted as if unoccluded.
    fn sample_lights(
        &self,
        vertex: &mut PathVertex<'s>,
        uniforms: &SceneUniforms,
    ) -> Vec<ShadowSample> {
        if !vertex.material.is_reflective() {
            return Vec::new();
        }

        let surface = vertex.surface();
        let (position, wo) = (vertex.position, vertex.wo);
        let (pixel, throughput) = (vertex.path.pixel, vertex.path.throughput);
        let rng = &mut vertex.path.rng;
        let light_samples = uniforms.light_samples.max(1);

        let mut samples = Vec::with_capacity(self.scene.shadow_rays_per_hit());
        let mut push = |ray: Ray, incoming: Color| {
            let wi = ray.direction;
            let cos_theta = surface.normal.dot(wi);
            if cos_theta <= 0.0 {
                return;
            }
            let f = self.shader.evaluate(&surface, wo, wi);
            let contribution = throughput * f * cos_theta * incoming;
            if contribution.max_element() > 0.0 {
                samples.push(ShadowSample {
                    pixel,
                    ray,
                    contribution,
                });
            }
        };

        let directional = self.scene.directional_lights.as_slice();
        for light in directional.iter().take(uniforms.directional_light_count as usize) {
            push(Ray::spawn(position, light.direction), light.radiance);
        }

        let point = self.scene.point_lights.as_slice();
        for light in point.iter().take(uniforms.point_light_count as usize) {
            let distance_squared = (light.position - position).length_squared();
            if distance_squared > 0.0 {
                push(Ray::segment(position, light.position), light.radiance / distance_squared);
            }
        }

        let quads = self.scene.quad_lights.as_slice();
        for light in quads.iter().take(uniforms.quad_light_count as usize) {
            let area = light.area();
            let normal = light.normal();
            for target in stratified_points(light, light_samples, &mut *rng) {
                let offset = target - position;
                let distance_squared = offset.length_squared();
                if distance_squared <= 0.0 {
                    continue;
                }
                let ray = Ray::segment(position, target);
                // Quad lights emit from both faces
                let cos_light = normal.dot(ray.direction).abs();
                let weight = cos_light * area / (distance_squared * light_samples as f32);
                push(ray, light.radiance * weight);
            }
        }

        samples
    }

    /// Continue a path past its current vertex, or end it.
    fn bounce(&self, mut vertex: PathVertex<'s>, roulette: bool) -> Option<PathState> {
        let surface = vertex.surface();
        let scatter = self
            .shader
            .sample(&surface, vertex.wo, &mut vertex.path.rng)?;

        let mut path = vertex.path;
        path.throughput *= scatter.throughput;
        if path.throughput.max_element() <= 0.0 {
            return None;
        }

        if roulette {
            let survival = self.config.roulette.survival(path.throughput);
            if survival <= 0.0 || path.rng.gen::<f32>() >= survival {
                return None;
            }
            path.throughput /= survival;
        }

        path.ray = Ray::spawn(vertex.position, scatter.direction);
        Some(path)
    }
}

/// Join a retired frame's worker and commit its buffer.
fn commit(
    frame: InFlightFrame<ScopedJoinHandle<'_, RenderResult<Vec<Color>>>>,
    film: &mut FrameAccumulator,
) -> RenderResult<()> {
    let sample = frame.uniforms.sample_index;
    let buffer = frame
        .pending
        .join()
        .map_err(|_| RenderError::WorkerPanicked(sample))??;
    film.add_sample(&buffer)?;
    Ok(())
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of the random stream owned by one path of one sample.
fn path_seed(seed: u64, sample: u32, pixel: usize) -> u64 {
    splitmix64(splitmix64(seed ^ u64::from(sample)) ^ pixel as u64)
}

/// `count` jittered points on a quad light. A perfect square count uses a
/// square grid of cells; any other count uses strips along `ab`.
fn stratified_points(light: &QuadLight, count: u32, rng: &mut impl Rng) -> Vec<Vec3> {
    let root = (count as f32).sqrt().round() as u32;
    if root * root == count {
        let cells = root as f32;
        (0..root)
            .flat_map(|i| (0..root).map(move |j| (i, j)))
            .map(|(i, j)| {
                let s = (i as f32 + rng.gen::<f32>()) / cells;
                let t = (j as f32 + rng.gen::<f32>()) / cells;
                light.point_at(s, t)
            })
            .collect()
    } else {
        (0..count)
            .map(|k| {
                let s = (k as f32 + rng.gen::<f32>()) / count as f32;
                light.point_at(s, rng.gen())
            })
            .collect()
    }
}
