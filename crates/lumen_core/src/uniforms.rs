//! Plain-old-data snapshots of the scene for per-frame upload.
//!
//! Layouts are `#[repr(C)]` with explicit padding so they can be copied into
//! a GPU uniform buffer with `bytemuck::bytes_of`. Light counts are the real
//! counts, never the placeholder-padded storage lengths.

use bytemuck::{Pod, Zeroable};
use lumen_math::Vec3;

use crate::camera::Camera;
use crate::scene::Scene;

fn pack(v: Vec3) -> [f32; 4] {
    v.extend(0.0).to_array()
}

fn unpack(v: [f32; 4]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub origin: [f32; 4],
    pub image_plane_top_left: [f32; 4],
    pub pixel_right: [f32; 4],
    pub pixel_down: [f32; 4],
}

impl From<&Camera> for CameraUniform {
    fn from(camera: &Camera) -> Self {
        Self {
            origin: pack(camera.origin),
            image_plane_top_left: pack(camera.image_plane_top_left),
            pixel_right: pack(camera.pixel_right),
            pixel_down: pack(camera.pixel_down),
        }
    }
}

impl From<&CameraUniform> for Camera {
    fn from(uniform: &CameraUniform) -> Self {
        Self {
            origin: unpack(uniform.origin),
            image_plane_top_left: unpack(uniform.image_plane_top_left),
            pixel_right: unpack(uniform.pixel_right),
            pixel_down: unpack(uniform.pixel_down),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub camera: CameraUniform,
    pub image_size: [u32; 2],
    pub directional_light_count: u32,
    pub point_light_count: u32,
    pub quad_light_count: u32,
    pub light_samples: u32,
    pub max_depth: u32,
    pub nee_on: u32,
    pub rr_on: u32,
    pub spp: u32,
    pub _padding: [u32; 2],
}

impl SceneUniforms {
    /// Returns `None` for an incomplete scene.
    pub fn from_scene(scene: &Scene) -> Option<Self> {
        let camera = scene.camera.as_ref()?;
        let s = &scene.settings;
        Some(Self {
            camera: CameraUniform::from(camera),
            image_size: [s.width, s.height],
            directional_light_count: scene.directional_lights.count() as u32,
            point_light_count: scene.point_lights.count() as u32,
            quad_light_count: scene.quad_lights.count() as u32,
            light_samples: s.light_samples,
            max_depth: s.max_depth,
            nee_on: u32::from(s.nee),
            rr_on: u32::from(s.russian_roulette),
            spp: s.spp,
            _padding: [0; 2],
        })
    }
}

/// Scene snapshot plus the per-sample values of one in-flight frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub scene: SceneUniforms,
    pub sample_index: u32,
    pub _padding: u32,
    pub seed: [u32; 2],
}

impl FrameUniforms {
    pub fn new(scene: SceneUniforms, sample_index: u32, seed: u64) -> Self {
        Self {
            scene,
            sample_index,
            _padding: 0,
            seed: [seed as u32, (seed >> 32) as u32],
        }
    }

    pub fn seed(&self) -> u64 {
        u64::from(self.seed[0]) | (u64::from(self.seed[1]) << 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSpec;

    fn scene_with_camera() -> Scene {
        let mut scene = Scene::new();
        scene.settings.width = 8;
        scene.settings.height = 4;
        let spec = CameraSpec {
            origin: Vec3::new(0.0, 0.0, 3.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45.0,
        };
        scene.camera = Some(Camera::derive(&spec, 8, 4).unwrap());
        scene.pad_lights();
        scene
    }

    #[test]
    fn test_layouts_have_no_implicit_padding() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 112);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 128);
    }

    #[test]
    fn test_uniforms_report_real_light_counts() {
        let scene = scene_with_camera();
        let uniforms = SceneUniforms::from_scene(&scene).unwrap();

        assert_eq!(scene.point_lights.as_slice().len(), 1);
        assert_eq!(uniforms.point_light_count, 0);
        assert_eq!(uniforms.directional_light_count, 0);
        assert_eq!(uniforms.quad_light_count, 0);
        assert_eq!(uniforms.image_size, [8, 4]);
    }

    #[test]
    fn test_camera_survives_packing() {
        let scene = scene_with_camera();
        let uniforms = SceneUniforms::from_scene(&scene).unwrap();
        let camera = Camera::from(&uniforms.camera);
        assert_eq!(Some(camera), scene.camera);
    }

    #[test]
    fn test_incomplete_scene_has_no_uniforms() {
        assert!(SceneUniforms::from_scene(&Scene::new()).is_none());
    }

    #[test]
    fn test_frame_seed_split() {
        let frame = FrameUniforms::new(SceneUniforms::default(), 3, 0x1234_5678_9abc_def0);
        assert_eq!(frame.seed(), 0x1234_5678_9abc_def0);
        assert_eq!(bytemuck::bytes_of(&frame).len(), 128);
    }
}
