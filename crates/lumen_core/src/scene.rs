//! Scene model for Lumen.
//!
//! A `Scene` is built once by the parser and then treated as read-only by the
//! renderer. Geometry is stored in world space; every primitive carries its
//! own copy of the material that was current when it was declared.

use std::fmt;
use std::ops::Range;

use lumen_math::{Color, Mat4, Vec3};

use crate::camera::Camera;

/// Surface description attached to every primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub diffuse: Color,
    pub specular: Color,
    pub emission: Color,
    /// Parsed and carried for completeness; the path tracer adds no
    /// constant ambient term.
    pub ambient: Color,
    /// Phong exponent (>= 0)
    pub shininess: f32,
    /// Microfacet roughness in [0, 1]
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Color::ZERO,
            specular: Color::ZERO,
            emission: Color::ZERO,
            ambient: Color::ZERO,
            shininess: 1.0,
            roughness: 0.0,
        }
    }
}

impl Material {
    /// A pure emitter: radiance only, no reflectance.
    pub fn emitter(radiance: Color) -> Self {
        Self {
            emission: radiance,
            ..Default::default()
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.max_element() > 0.0
    }

    /// True if the surface reflects any light at all.
    pub fn is_reflective(&self) -> bool {
        self.diffuse.max_element() > 0.0 || self.specular.max_element() > 0.0
    }
}

/// A world-space triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub material: Material,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: Material) -> Self {
        Self {
            vertices: [v0, v1, v2],
            material,
        }
    }

    /// Unit geometric normal following the vertex winding.
    pub fn normal(&self) -> Vec3 {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    pub fn area(&self) -> f32 {
        let [v0, v1, v2] = self.vertices;
        0.5 * (v1 - v0).cross(v2 - v0).length()
    }

    /// Point at barycentric coordinates (u, v) relative to v1 and v2.
    pub fn point_at(&self, u: f32, v: f32) -> Vec3 {
        let [v0, v1, v2] = self.vertices;
        v0 * (1.0 - u - v) + v1 * u + v2 * v
    }
}

/// A unit sphere placed in the world by an affine transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    /// Unit-sphere-to-world transform
    pub transform: Mat4,
    /// Cached world-to-unit-sphere transform
    pub inverse: Mat4,
    pub material: Material,
}

impl Sphere {
    /// Returns `None` if the transform cannot be inverted.
    pub fn new(transform: Mat4, material: Material) -> Option<Self> {
        let det = transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self {
            transform,
            inverse: transform.inverse(),
            material,
        })
    }

    /// World-space center.
    pub fn center(&self) -> Vec3 {
        self.transform.transform_point3(Vec3::ZERO)
    }

    /// Unit outward normal at a world-space point on the surface.
    ///
    /// The unit-sphere normal is the local point itself; it goes back to world
    /// space through the inverse transpose so ellipsoids stay correct.
    pub fn normal_at(&self, position: Vec3) -> Vec3 {
        let local = self.inverse.transform_point3(position);
        self.inverse
            .transpose()
            .transform_vector3(local)
            .normalize_or_zero()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionalLight {
    /// Direction toward the light
    pub direction: Vec3,
    pub radiance: Color,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub radiance: Color,
}

/// Parallelogram area light spanned by `ab` and `ac` from corner `a`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadLight {
    pub a: Vec3,
    pub ab: Vec3,
    pub ac: Vec3,
    pub radiance: Color,
}

impl QuadLight {
    pub fn area(&self) -> f32 {
        self.ab.cross(self.ac).length()
    }

    /// Unit normal following `ab x ac`.
    pub fn normal(&self) -> Vec3 {
        self.ab.cross(self.ac).normalize_or_zero()
    }

    /// Point at parametric coordinates (s, t) in [0, 1]^2.
    pub fn point_at(&self, s: f32, t: f32) -> Vec3 {
        self.a + self.ab * s + self.ac * t
    }

    /// The two emissive triangles that make the light visible to camera rays.
    pub fn triangles(&self) -> [Triangle; 2] {
        let material = Material::emitter(self.radiance);
        let b = self.a + self.ab;
        let c = self.a + self.ac;
        let d = self.a + self.ab + self.ac;
        [
            Triangle::new(self.a, b, d, material),
            Triangle::new(self.a, d, c, material),
        ]
    }
}

/// A typed light collection that may hold a zero-radiance placeholder.
///
/// Consumers that need a non-empty array get `as_slice()`; consumers that
/// need the number of lights the scene actually declared use `count()`.
#[derive(Clone, Debug, Default)]
pub struct LightList<T> {
    lights: Vec<T>,
    padded: bool,
}

impl<T> LightList<T> {
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            padded: false,
        }
    }

    pub fn push(&mut self, light: T) {
        if self.padded {
            self.lights.clear();
            self.padded = false;
        }
        self.lights.push(light);
    }

    /// Insert `placeholder` if the collection is empty.
    pub fn pad_with(&mut self, placeholder: T) {
        if self.lights.is_empty() {
            self.lights.push(placeholder);
            self.padded = true;
        }
    }

    /// Number of real lights, excluding a placeholder.
    pub fn count(&self) -> usize {
        if self.padded {
            self.lights.len() - 1
        } else {
            self.lights.len()
        }
    }

    pub fn is_padded(&self) -> bool {
        self.padded
    }

    /// Stored entries, placeholder included.
    pub fn as_slice(&self) -> &[T] {
        &self.lights
    }

    /// Only the real lights.
    pub fn real(&self) -> &[T] {
        &self.lights[..self.count()]
    }
}

/// Shading model selected by the `brdf` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrdfKind {
    #[default]
    Phong,
    Ggx,
}

/// Scalar render settings read from the scene file.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub output: String,
    pub spp: u32,
    pub max_depth: u32,
    /// Stratified samples per quad light
    pub light_samples: u32,
    pub nee: bool,
    pub russian_roulette: bool,
    pub brdf: BrdfKind,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            output: "output.png".to_string(),
            spp: 1,
            max_depth: 5,
            light_samples: 1,
            nee: false,
            russian_roulette: false,
            brdf: BrdfKind::Phong,
        }
    }
}

impl RenderSettings {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// The parsed scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub settings: RenderSettings,
    pub camera: Option<Camera>,
    pub triangles: Vec<Triangle>,
    pub spheres: Vec<Sphere>,
    pub directional_lights: LightList<DirectionalLight>,
    pub point_lights: LightList<PointLight>,
    pub quad_lights: LightList<QuadLight>,
    /// Triangle indices synthesized from quad lights
    light_geometry: Range<usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene is renderable once its camera has been derived.
    pub fn is_complete(&self) -> bool {
        self.camera.is_some()
    }

    /// Number of primitives visible to the intersector.
    pub fn primitive_count(&self) -> usize {
        self.triangles.len() + self.spheres.len()
    }

    /// Material of a primitive addressed the way the intersector reports it:
    /// triangles first, then spheres.
    pub fn material(&self, primitive_index: usize) -> Option<&Material> {
        let triangles = self.triangles.len();
        if primitive_index < triangles {
            Some(&self.triangles[primitive_index].material)
        } else {
            self.spheres
                .get(primitive_index - triangles)
                .map(|s| &s.material)
        }
    }

    /// True if the primitive is one of the triangles standing in for a quad
    /// light. Next event estimation already samples those emitters.
    pub fn is_light_geometry(&self, primitive_index: usize) -> bool {
        self.light_geometry.contains(&primitive_index)
    }

    /// Shadow rays fired per shading point when NEE is on.
    pub fn shadow_rays_per_hit(&self) -> usize {
        self.directional_lights.count()
            + self.point_lights.count()
            + self.quad_lights.count() * self.settings.light_samples as usize
    }

    /// Append two emissive triangles for every real quad light.
    pub(crate) fn add_quad_light_geometry(&mut self) {
        let emitters: Vec<Triangle> = self
            .quad_lights
            .real()
            .iter()
            .flat_map(|light| light.triangles())
            .collect();
        let start = self.triangles.len();
        self.triangles.extend(emitters);
        self.light_geometry = start..self.triangles.len();
    }

    /// Give every empty light collection one zero-radiance placeholder.
    pub(crate) fn pad_lights(&mut self) {
        self.directional_lights.pad_with(DirectionalLight {
            direction: Vec3::X,
            radiance: Color::ZERO,
        });
        self.point_lights.pad_with(PointLight::default());
        self.quad_lights.pad_with(QuadLight::default());
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.settings;
        writeln!(f, "maxDepth:\t{}", s.max_depth)?;
        writeln!(f, "imageSize:\t{}x{}", s.width, s.height)?;
        writeln!(f, "outputName:\t{}", s.output)?;
        writeln!(f, "spp:\t\t{}", s.spp)?;
        writeln!(f, "nee:\t\t{}", if s.nee { "on" } else { "off" })?;
        writeln!(f, "triangles:\t{}", self.triangles.len())?;
        writeln!(f, "spheres:\t{}", self.spheres.len())?;
        write!(
            f,
            "lights:\t\t{} directional, {} point, {} quad",
            self.directional_lights.count(),
            self.point_lights.count(),
            self.quad_lights.count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_list_padding() {
        let mut lights: LightList<PointLight> = LightList::new();
        lights.pad_with(PointLight::default());

        assert_eq!(lights.count(), 0);
        assert_eq!(lights.as_slice().len(), 1);
        assert_eq!(lights.as_slice()[0].radiance, Color::ZERO);
        assert!(lights.real().is_empty());
    }

    #[test]
    fn test_light_list_no_padding_when_populated() {
        let mut lights = LightList::new();
        lights.push(PointLight {
            position: Vec3::ONE,
            radiance: Color::ONE,
        });
        lights.pad_with(PointLight::default());

        assert_eq!(lights.count(), 1);
        assert!(!lights.is_padded());
        assert_eq!(lights.as_slice().len(), 1);
    }

    #[test]
    fn test_quad_light_triangles_cover_square() {
        let light = QuadLight {
            a: Vec3::ZERO,
            ab: Vec3::X,
            ac: Vec3::Y,
            radiance: Color::new(1.0, 2.0, 3.0),
        };
        let [t0, t1] = light.triangles();

        assert!((t0.area() + t1.area() - 1.0).abs() < 1e-6);
        for tri in [t0, t1] {
            assert_eq!(tri.material.emission, light.radiance);
            assert_eq!(tri.material.diffuse, Color::ZERO);
            assert_eq!(tri.material.specular, Color::ZERO);
            assert_eq!(tri.material.ambient, Color::ZERO);
            assert!(tri.vertices.iter().all(|v| v.z == 0.0));
        }
    }

    #[test]
    fn test_material_lookup_spans_triangles_then_spheres() {
        let mut scene = Scene::new();
        scene.triangles.push(Triangle::new(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Material::emitter(Color::ONE),
        ));
        let red = Material {
            diffuse: Color::new(1.0, 0.0, 0.0),
            ..Default::default()
        };
        scene.spheres.push(Sphere::new(Mat4::IDENTITY, red).unwrap());

        assert!(scene.material(0).unwrap().is_emissive());
        assert_eq!(scene.material(1), Some(&red));
        assert_eq!(scene.material(2), None);
    }

    #[test]
    fn test_only_quad_triangles_are_light_geometry() {
        let mut scene = Scene::new();
        scene.triangles.push(Triangle::new(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Material::emitter(Color::ONE),
        ));
        scene.quad_lights.push(QuadLight {
            a: Vec3::ZERO,
            ab: Vec3::X,
            ac: Vec3::Y,
            radiance: Color::ONE,
        });
        scene
            .spheres
            .push(Sphere::new(Mat4::IDENTITY, Material::emitter(Color::ONE)).unwrap());
        scene.add_quad_light_geometry();

        assert_eq!(scene.triangles.len(), 3);
        // The user-declared emitter is not light geometry, nor is the sphere
        assert!(!scene.is_light_geometry(0));
        assert!(scene.is_light_geometry(1));
        assert!(scene.is_light_geometry(2));
        assert!(!scene.is_light_geometry(3));
    }

    #[test]
    fn test_ellipsoid_normal_is_perpendicular_to_surface() {
        let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
            * Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let sphere = Sphere::new(transform, Material::default()).unwrap();

        // Tip of the long axis
        let tip = sphere.normal_at(Vec3::new(2.0, 0.0, -5.0));
        assert!((tip - Vec3::X).length() < 1e-5);

        // Local point (1, 1, 0) / sqrt 2 maps to (sqrt 2, 1 / sqrt 2, -5)
        let h = std::f32::consts::FRAC_1_SQRT_2;
        let n = sphere.normal_at(Vec3::new(2.0 * h, h, -5.0));
        // Surface tangent there is the image of local (1, -1, 0)
        let tangent = Vec3::new(2.0, -1.0, 0.0);
        assert!(n.dot(tangent).abs() < 1e-5);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_singular_sphere_rejected() {
        assert!(Sphere::new(Mat4::from_scale(Vec3::ZERO), Material::default()).is_none());
    }

    #[test]
    fn test_shadow_rays_per_hit_uses_real_counts() {
        let mut scene = Scene::new();
        scene.settings.light_samples = 4;
        scene.quad_lights.push(QuadLight::default());
        scene.pad_lights();

        assert_eq!(scene.shadow_rays_per_hit(), 4);
    }
}
