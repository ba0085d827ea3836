//! `lumen <scene-file>`: render a scene description to an image.

use std::path::Path;

use anyhow::{bail, Context, Result};
use lumen_core::load_scene;
use lumen_renderer::{CpuIntersector, ImageSink, PathTracer, PngSink, RenderConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(scene_path) = args.get(1) else {
        let program = args.first().map_or("lumen", String::as_str);
        log::error!("No scene file given");
        bail!("usage: {} <scene-file>", program);
    };

    let scene = load_scene(scene_path)
        .with_context(|| format!("failed to load scene {}", scene_path))?;
    if !scene.is_complete() {
        log::error!("{} declares no usable camera", scene_path);
        bail!("scene {} is incomplete: it needs a valid camera", scene_path);
    }
    log::info!("Scene summary:\n{}", scene);

    let tracer = PathTracer::new(&scene, CpuIntersector, RenderConfig::default())?;
    let film = tracer.render().context("render failed")?;

    let settings = &scene.settings;
    let output = Path::new(&settings.output);
    PngSink
        .write(&film.finalize(), settings.width, settings.height, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    log::info!("Done: {}", output.display());
    Ok(())
}
