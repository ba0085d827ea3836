//! Lumen Renderer - Wavefront Monte Carlo path tracing.
//!
//! A path tracer for scenes parsed by `lumen_core`, with next event
//! estimation and Russian roulette. Ray queries go through the
//! [`Intersector`] trait; [`CpuIntersector`] is the BVH backend.

mod accumulator;
mod bvh;
mod film;
mod frames;
mod ggx;
mod hittable;
mod integrator;
mod intersector;
mod phong;
mod shader;
mod sphere;
mod triangle;

pub use accumulator::{quantize, AccumulateError, FrameAccumulator};
pub use bvh::BvhNode;
pub use film::{ImageSink, PngSink, SinkError, SinkResult};
pub use frames::{FramePermit, FrameRing, InFlightFrame, InFlightLimiter, MAX_FRAMES_IN_FLIGHT};
pub use ggx::GgxShader;
pub use hittable::Hittable;
pub use integrator::{PathTracer, RenderConfig, RenderError, RenderResult, RoulettePolicy};
pub use intersector::{
    CpuIntersector, IntersectError, IntersectResult, Intersection, IntersectionMode, Intersector,
};
pub use phong::PhongShader;
pub use shader::{shader_for, ScatterSample, Shader, SurfaceHit};

/// Re-export common math types from lumen_math
pub use lumen_math::{Color, Ray, Vec3};
