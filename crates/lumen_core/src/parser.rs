//! Scene description parser.
//!
//! The format is line oriented: one command per line, whitespace-separated
//! positional arguments, `#` starts a comment line. Commands are executed in
//! file order against parser-local state (transform stack, current material,
//! vertex pool). A command whose arguments do not parse is skipped as a whole
//! and recorded as a [`ParseIssue`]; unknown commands are ignored.
//!
//! # Example
//!
//! ```
//! use lumen_core::parse_scene;
//!
//! let scene = parse_scene(
//!     "size 64 48\n\
//!      camera 0 0 5 0 0 0 0 1 0 45\n\
//!      emission 1 1 1\n\
//!      sphere 0 0 0 1\n",
//! );
//! assert!(scene.is_complete());
//! assert_eq!(scene.spheres.len(), 1);
//! ```

use std::path::Path;

use lumen_math::{Color, Mat4, TransformError, TransformStack, Vec3};
use thiserror::Error;

use crate::camera::{Camera, CameraError, CameraSpec};
use crate::scene::{
    BrdfKind, DirectionalLight, Material, PointLight, QuadLight, Scene, Sphere, Triangle,
};

/// A malformed command. The offending line is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("`{command}` expects {expected} arguments, found {found}")]
    MissingArguments {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("`{command}`: invalid number `{token}`")]
    InvalidNumber { command: String, token: String },

    #[error("`{command}`: {message}")]
    OutOfRange { command: String, message: String },

    #[error("vertex index {index} out of range ({count} vertices declared)")]
    VertexOutOfRange { index: i64, count: usize },

    #[error("sphere transform is not invertible")]
    SingularSphere,

    #[error("unknown brdf `{0}`")]
    UnknownBrdf(String),

    #[error("camera: {0}")]
    Camera(#[from] CameraError),

    #[error("transform: {0}")]
    Transform(#[from] TransformError),
}

/// Errors that prevent a scene from being produced at all.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A skipped line and the reason it was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseIssue {
    /// 1-based line number
    pub line: usize,
    pub error: ParseError,
}

/// Positional arguments of one command.
struct Args<'a> {
    command: &'a str,
    tokens: &'a [&'a str],
}

impl<'a> Args<'a> {
    fn require(&self, count: usize) -> Result<(), ParseError> {
        if self.tokens.len() < count {
            return Err(ParseError::MissingArguments {
                command: self.command.to_string(),
                expected: count,
                found: self.tokens.len(),
            });
        }
        Ok(())
    }

    fn parse<T: std::str::FromStr>(&self, index: usize) -> Result<T, ParseError> {
        let token = self.tokens[index];
        token.parse().map_err(|_| ParseError::InvalidNumber {
            command: self.command.to_string(),
            token: token.to_string(),
        })
    }

    fn f32(&self, index: usize) -> Result<f32, ParseError> {
        let value: f32 = self.parse(index)?;
        if !value.is_finite() {
            return Err(self.out_of_range(format!("{value} is not finite")));
        }
        Ok(value)
    }

    fn vec3(&self, start: usize) -> Result<Vec3, ParseError> {
        Ok(Vec3::new(
            self.f32(start)?,
            self.f32(start + 1)?,
            self.f32(start + 2)?,
        ))
    }

    /// A strictly positive integer.
    fn count(&self, index: usize) -> Result<u32, ParseError> {
        let value: u32 = self.parse(index)?;
        if value == 0 {
            return Err(self.out_of_range("must be at least 1".to_string()));
        }
        Ok(value)
    }

    /// `off` (any case) is false; any other token, or none, is true.
    fn toggle(&self) -> bool {
        self.tokens
            .first()
            .map_or(true, |t| !t.eq_ignore_ascii_case("off"))
    }

    fn out_of_range(&self, message: String) -> ParseError {
        ParseError::OutOfRange {
            command: self.command.to_string(),
            message,
        }
    }
}

/// Incremental scene parser holding the state of one parse.
pub struct SceneParser {
    scene: Scene,
    transforms: TransformStack,
    material: Material,
    vertices: Vec<Vec3>,
    camera: Option<(usize, CameraSpec)>,
    issues: Vec<ParseIssue>,
    current_line: usize,
}

impl SceneParser {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            transforms: TransformStack::new(),
            material: Material::default(),
            vertices: Vec::new(),
            camera: None,
            issues: Vec::new(),
            current_line: 0,
        }
    }

    /// Parse a whole document, then run the post-pass.
    pub fn parse(mut self, text: &str) -> (Scene, Vec<ParseIssue>) {
        for (index, line) in text.lines().enumerate() {
            self.parse_line(index + 1, line);
        }
        self.finish()
    }

    /// Execute one line. Blank and comment lines are ignored.
    pub fn parse_line(&mut self, line_number: usize, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = tokens.split_first() else {
            return;
        };
        if command.starts_with('#') {
            return;
        }

        self.current_line = line_number;
        let args = Args {
            command,
            tokens: rest,
        };
        if let Err(error) = self.execute(&args) {
            log::warn!("line {}: {} (skipped)", line_number, error);
            self.issues.push(ParseIssue {
                line: line_number,
                error,
            });
        }
    }

    /// Current object-to-world transform.
    pub fn current_transform(&self) -> Mat4 {
        self.transforms.top()
    }

    /// Current material record.
    pub fn current_material(&self) -> &Material {
        &self.material
    }

    fn execute(&mut self, args: &Args<'_>) -> Result<(), ParseError> {
        match args.command {
            // Render settings
            "size" => {
                args.require(2)?;
                let (width, height) = (args.count(0)?, args.count(1)?);
                self.scene.settings.width = width;
                self.scene.settings.height = height;
            }
            "maxDepth" | "maxdepth" => {
                args.require(1)?;
                self.scene.settings.max_depth = args.parse(0)?;
            }
            "output" => {
                args.require(1)?;
                self.scene.settings.output = args.tokens[0].to_string();
            }
            "spp" => {
                args.require(1)?;
                self.scene.settings.spp = args.count(0)?;
            }
            "lightsamples" => {
                args.require(1)?;
                self.scene.settings.light_samples = args.count(0)?;
            }
            "nee" => self.scene.settings.nee = args.toggle(),
            "russianroulette" => self.scene.settings.russian_roulette = args.toggle(),
            "brdf" => {
                args.require(1)?;
                self.scene.settings.brdf = match args.tokens[0].to_ascii_lowercase().as_str() {
                    "phong" => BrdfKind::Phong,
                    "ggx" => BrdfKind::Ggx,
                    other => return Err(ParseError::UnknownBrdf(other.to_string())),
                };
            }

            // Camera and geometry
            "camera" => {
                args.require(10)?;
                let spec = CameraSpec {
                    origin: args.vec3(0)?,
                    look_at: args.vec3(3)?,
                    up: args.vec3(6)?,
                    fov_y: args.f32(9)?,
                };
                self.camera = Some((self.current_line, spec));
            }
            "vertex" => {
                args.require(3)?;
                let vertex = args.vec3(0)?;
                self.vertices.push(vertex);
            }
            "tri" => {
                args.require(3)?;
                let indices = [args.parse::<i64>(0)?, args.parse(1)?, args.parse(2)?];
                let mut corners = [Vec3::ZERO; 3];
                for (corner, &index) in corners.iter_mut().zip(&indices) {
                    let local = usize::try_from(index)
                        .ok()
                        .and_then(|i| self.vertices.get(i))
                        .ok_or(ParseError::VertexOutOfRange {
                            index,
                            count: self.vertices.len(),
                        })?;
                    *corner = self.transforms.top().transform_point3(*local);
                }
                let [v0, v1, v2] = corners;
                self.scene
                    .triangles
                    .push(Triangle::new(v0, v1, v2, self.material));
            }
            "sphere" => {
                args.require(4)?;
                let center = args.vec3(0)?;
                let radius = args.f32(3)?;
                let transform = self.transforms.top()
                    * Mat4::from_translation(center)
                    * Mat4::from_scale(Vec3::splat(radius));
                let sphere =
                    Sphere::new(transform, self.material).ok_or(ParseError::SingularSphere)?;
                self.scene.spheres.push(sphere);
            }

            // Transforms
            "translate" => {
                args.require(3)?;
                let offset = args.vec3(0)?;
                self.transforms.translate(offset);
            }
            "rotate" => {
                args.require(4)?;
                let axis = args.vec3(0)?;
                let degrees = args.f32(3)?;
                self.transforms.rotate(axis, degrees)?;
            }
            "scale" => {
                args.require(3)?;
                let factors = args.vec3(0)?;
                self.transforms.scale(factors);
            }
            "pushTransform" => self.transforms.push(),
            "popTransform" => self.transforms.pop()?,

            // Material
            "diffuse" => self.material.diffuse = Self::color(args)?,
            "specular" => self.material.specular = Self::color(args)?,
            "emission" => self.material.emission = Self::color(args)?,
            "ambient" => self.material.ambient = Self::color(args)?,
            "shininess" => {
                args.require(1)?;
                let shininess = args.f32(0)?;
                if shininess < 0.0 {
                    return Err(args.out_of_range(format!("{shininess} is negative")));
                }
                self.material.shininess = shininess;
            }
            "roughness" => {
                args.require(1)?;
                self.material.roughness = args.f32(0)?.clamp(0.0, 1.0);
            }

            // Lights
            "directional" => {
                args.require(6)?;
                let direction = args
                    .vec3(0)?
                    .try_normalize()
                    .ok_or_else(|| args.out_of_range("zero direction".to_string()))?;
                let radiance = args.vec3(3)?;
                self.scene
                    .directional_lights
                    .push(DirectionalLight { direction, radiance });
            }
            "point" => {
                args.require(6)?;
                let light = PointLight {
                    position: args.vec3(0)?,
                    radiance: args.vec3(3)?,
                };
                self.scene.point_lights.push(light);
            }
            "quadLight" => {
                args.require(12)?;
                let light = QuadLight {
                    a: args.vec3(0)?,
                    ab: args.vec3(3)?,
                    ac: args.vec3(6)?,
                    radiance: args.vec3(9)?,
                };
                self.scene.quad_lights.push(light);
            }

            other => {
                log::debug!("line {}: ignoring unknown command `{}`", self.current_line, other);
            }
        }
        Ok(())
    }

    fn color(args: &Args<'_>) -> Result<Color, ParseError> {
        args.require(3)?;
        args.vec3(0)
    }

    /// Derive the camera, add quad light geometry and pad light collections.
    pub fn finish(mut self) -> (Scene, Vec<ParseIssue>) {
        let settings = &self.scene.settings;
        match self.camera {
            Some((line, spec)) => match Camera::derive(&spec, settings.width, settings.height) {
                Ok(camera) => self.scene.camera = Some(camera),
                Err(error) => {
                    log::warn!("line {}: {} (scene left without a camera)", line, error);
                    self.issues.push(ParseIssue {
                        line,
                        error: error.into(),
                    });
                }
            },
            None => log::warn!("scene declares no camera"),
        }

        self.scene.add_quad_light_geometry();
        self.scene.pad_lights();

        log::info!(
            "Parsed scene: {} triangles, {} spheres, {} skipped lines",
            self.scene.triangles.len(),
            self.scene.spheres.len(),
            self.issues.len()
        );
        (self.scene, self.issues)
    }
}

impl Default for SceneParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse scene text, logging and discarding anomalies.
pub fn parse_scene(text: &str) -> Scene {
    SceneParser::new().parse(text).0
}

/// Read and parse a scene file.
pub fn load_scene<P: AsRef<Path>>(path: P) -> LoadResult<Scene> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    log::info!("Loading scene from {}", path.display());
    Ok(parse_scene(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERA: &str = "camera 0 0 5 0 0 0 0 1 0 45\n";

    fn parse_with_issues(text: &str) -> (Scene, Vec<ParseIssue>) {
        let _ = env_logger::builder().is_test(true).try_init();
        SceneParser::new().parse(text)
    }

    #[test]
    fn test_render_settings() {
        let (scene, issues) = parse_with_issues(
            "size 640 480\nmaxdepth 7\noutput cornell.png\nspp 16\nlightsamples 9\nnee on\n\
             russianroulette ON\nbrdf ggx\n",
        );
        let s = &scene.settings;
        assert!(issues.is_empty());
        assert_eq!((s.width, s.height), (640, 480));
        assert_eq!(s.max_depth, 7);
        assert_eq!(s.output, "cornell.png");
        assert_eq!(s.spp, 16);
        assert_eq!(s.light_samples, 9);
        assert!(s.nee);
        assert!(s.russian_roulette);
        assert_eq!(s.brdf, BrdfKind::Ggx);
    }

    #[test]
    fn test_defaults_when_commands_absent() {
        let scene = parse_scene("");
        assert_eq!(scene.settings, crate::RenderSettings::default());
        assert!(!scene.settings.nee);
        assert_eq!(scene.settings.output, "output.png");
    }

    #[test]
    fn test_nee_toggle_tokens() {
        assert!(!parse_scene("nee OFF").settings.nee);
        assert!(!parse_scene("nee off").settings.nee);
        assert!(parse_scene("nee").settings.nee);
        assert!(parse_scene("nee yes").settings.nee);
        assert!(!parse_scene("nee on\nnee Off").settings.nee);
    }

    #[test]
    fn test_missing_camera_is_incomplete() {
        let scene = parse_scene("size 10 10\nvertex 0 0 0\n");
        assert!(!scene.is_complete());
    }

    #[test]
    fn test_camera_uses_final_size() {
        let scene = parse_scene(&format!("size 10 10\n{CAMERA}size 20 10\n"));
        let camera = scene.camera.unwrap();
        // Aspect 2 makes the horizontal step equal to the vertical one
        assert!((camera.pixel_right.length() - camera.pixel_down.length()).abs() < 1e-6);
        let expected = Camera::derive(
            &CameraSpec {
                origin: Vec3::new(0.0, 0.0, 5.0),
                look_at: Vec3::ZERO,
                up: Vec3::Y,
                fov_y: 45.0,
            },
            20,
            10,
        )
        .unwrap();
        assert_eq!(camera, expected);
    }

    #[test]
    fn test_degenerate_camera_leaves_scene_incomplete() {
        let (scene, issues) = parse_with_issues("camera 0 0 0 0 0 0 0 1 0 45\n");
        assert!(!scene.is_complete());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
    }

    #[test]
    fn test_comments_blank_and_unknown_lines() {
        let text = "# a comment\n\n   \n#size 1 1\nfrobnicate 1 2 3\nsize 3 4\n";
        let (scene, issues) = parse_with_issues(text);
        assert!(issues.is_empty());
        assert_eq!((scene.settings.width, scene.settings.height), (3, 4));
    }

    #[test]
    fn test_malformed_command_is_skipped_whole() {
        let (scene, issues) = parse_with_issues("size 32 32\nsize 64 abc\ndiffuse 1 x 1\n");
        assert_eq!((scene.settings.width, scene.settings.height), (32, 32));
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].line, 2);
        assert!(matches!(issues[1].error, ParseError::InvalidNumber { .. }));

        let (scene, issues) = parse_with_issues("size 8\n");
        assert_eq!(scene.settings.width, 400);
        assert!(matches!(
            issues[0].error,
            ParseError::MissingArguments { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_tri_uses_transform_at_declaration() {
        let text = "vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n\
                    pushTransform\ntranslate 0 0 -2\ntri 0 1 2\npopTransform\ntri 0 1 2\n";
        let scene = parse_scene(text);
        assert_eq!(scene.triangles.len(), 2);
        assert_eq!(scene.triangles[0].vertices[1], Vec3::new(1.0, 0.0, -2.0));
        assert_eq!(scene.triangles[1].vertices[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_tri_out_of_range_is_skipped() {
        let text = "vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntri 0 1 2\ntri 0 1 3\ntri -1 0 1\n";
        let (scene, issues) = parse_with_issues(text);

        assert_eq!(scene.triangles.len(), 1);
        assert_eq!(scene.triangles[0].vertices[2], Vec3::Y);
        assert_eq!(
            issues[0].error,
            ParseError::VertexOutOfRange { index: 3, count: 3 }
        );
        assert_eq!(
            issues[1].error,
            ParseError::VertexOutOfRange { index: -1, count: 3 }
        );
    }

    #[test]
    fn test_push_pop_pair_keeps_transform() {
        let mut parser = SceneParser::new();
        parser.parse_line(1, "rotate 0 1 0 30");
        parser.parse_line(2, "translate 1 2 3");
        let before = parser.current_transform();

        parser.parse_line(3, "pushTransform");
        parser.parse_line(4, "popTransform");
        assert_eq!(parser.current_transform(), before);
    }

    #[test]
    fn test_pop_root_is_an_issue() {
        let (_, issues) = parse_with_issues("popTransform\n");
        assert_eq!(issues[0].error, ParseError::Transform(TransformError::PopRoot));
    }

    #[test]
    fn test_sphere_composition() {
        let scene = parse_scene("translate 0 0 -5\nsphere 1 0 0 2\n");
        let sphere = &scene.spheres[0];

        assert!((sphere.center() - Vec3::new(1.0, 0.0, -5.0)).length() < 1e-5);
        let surface = sphere.transform.transform_point3(Vec3::X);
        assert!((surface - Vec3::new(3.0, 0.0, -5.0)).length() < 1e-5);

        let (scene, issues) = parse_with_issues("sphere 0 0 0 0\n");
        assert!(scene.spheres.is_empty());
        assert_eq!(issues[0].error, ParseError::SingularSphere);
    }

    #[test]
    fn test_material_snapshot_per_primitive() {
        let text = "vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n\
                    diffuse 1 0 0\ntri 0 1 2\n\
                    diffuse 0 1 0\nshininess 30\nroughness 2\ntri 0 1 2\n";
        let scene = parse_scene(text);

        assert_eq!(scene.triangles[0].material.diffuse, Color::new(1.0, 0.0, 0.0));
        assert_eq!(scene.triangles[0].material.shininess, 1.0);
        assert_eq!(scene.triangles[1].material.diffuse, Color::new(0.0, 1.0, 0.0));
        assert_eq!(scene.triangles[1].material.shininess, 30.0);
        assert_eq!(scene.triangles[1].material.roughness, 1.0);
    }

    #[test]
    fn test_lights_and_padding() {
        let text = "directional 0 0 2 1 1 1\nquadLight 0 0 0 1 0 0 0 1 0 5 5 5\n";
        let scene = parse_scene(text);

        assert_eq!(scene.directional_lights.count(), 1);
        assert_eq!(scene.directional_lights.real()[0].direction, Vec3::Z);
        assert_eq!(scene.point_lights.count(), 0);
        assert_eq!(scene.point_lights.as_slice().len(), 1);
        assert_eq!(scene.point_lights.as_slice()[0].radiance, Color::ZERO);
        assert_eq!(scene.quad_lights.count(), 1);
    }

    #[test]
    fn test_quad_light_geometry_appended_last() {
        let text = "vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ndiffuse 1 1 1\n\
                    quadLight 0 0 0 1 0 0 0 1 0 2 3 4\ntri 0 1 2\n";
        let scene = parse_scene(text);

        assert_eq!(scene.triangles.len(), 3);
        assert_eq!(scene.triangles[0].material.diffuse, Color::ONE);

        let area: f32 = scene.triangles[1..].iter().map(Triangle::area).sum();
        assert!((area - 1.0).abs() < 1e-6);
        for tri in &scene.triangles[1..] {
            assert_eq!(tri.material, Material::emitter(Color::new(2.0, 3.0, 4.0)));
        }
    }

    #[test]
    fn test_unknown_brdf_keeps_previous() {
        let (scene, issues) = parse_with_issues("brdf ggx\nbrdf lambert\n");
        assert_eq!(scene.settings.brdf, BrdfKind::Ggx);
        assert_eq!(issues[0].error, ParseError::UnknownBrdf("lambert".to_string()));
    }

    #[test]
    fn test_load_scene_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_scene(dir.path().join("missing.test"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_load_scene_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.test");
        std::fs::write(&path, format!("size 4 4\n{CAMERA}")).unwrap();

        let scene = load_scene(&path).unwrap();
        assert!(scene.is_complete());
        assert_eq!(scene.settings.pixel_count(), 16);
    }
}
