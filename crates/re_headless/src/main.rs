use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use re_tracer::{BvhEngine, HybridRenderer, RenderSettings};

mod demo;

const DEMO_SEED: u64 = 7;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [settings.json] [output.png]", args[0]);
        return Ok(());
    }

    let settings = match args.get(1) {
        Some(path) => RenderSettings::load(path).with_context(|| format!("loading settings from {path}"))?,
        None => RenderSettings::default(),
    };
    let output = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("render.png"));

    log::info!("Starting RayEngine headless render");

    let scene = demo::build(DEMO_SEED).context("building demo scene")?;
    log::info!(
        "Scene '{}': {} objects, {} triangles, {} lights",
        scene.name,
        scene.objects.len(),
        scene.total_triangle_count(),
        scene.lights().len()
    );

    // One engine per backend, as each would own its own acceleration structure
    let mut renderer = HybridRenderer::from_settings(&settings, BvhEngine::build(&scene), BvhEngine::build(&scene));

    let mut total = Duration::ZERO;
    for _ in 0..settings.frames.max(1) {
        let stats = renderer.render(&scene);
        total += stats.total_time;
        log::info!("{stats}");
    }

    let frames = settings.frames.max(1);
    log::info!(
        "{} frames in {:.2?} ({:.2?} per frame), final CPU share {:.3}",
        frames,
        total,
        total / frames,
        renderer.controller().fraction()
    );

    let image = renderer.output();
    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .context("color buffer does not match its dimensions")?;
    rgba.save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    log::info!("Wrote {}", output.display());

    Ok(())
}
