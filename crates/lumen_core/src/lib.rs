//! Lumen Core - Scene model and scene description parsing.
//!
//! This crate provides:
//!
//! - **Scene model**: `Scene`, `Material`, `Triangle`, `Sphere`, the three
//!   light kinds and `RenderSettings`
//! - **Camera**: derivation of the image plane from eye/look-at/up/fov
//! - **Parser**: the line-oriented scene format, with a transform stack
//! - **Uniforms**: `bytemuck` snapshots of the scene for per-frame upload
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::load_scene;
//!
//! let scene = load_scene("cornell.test")?;
//! if scene.is_complete() {
//!     println!("{}", scene);
//! }
//! ```

pub mod camera;
pub mod parser;
pub mod scene;
pub mod uniforms;

// Re-export commonly used types
pub use camera::{Camera, CameraError, CameraSpec};
pub use parser::{
    load_scene, parse_scene, LoadError, LoadResult, ParseError, ParseIssue, SceneParser,
};
pub use scene::{
    BrdfKind, DirectionalLight, LightList, Material, PointLight, QuadLight, RenderSettings,
    Scene, Sphere, Triangle,
};
pub use uniforms::{CameraUniform, FrameUniforms, SceneUniforms};
