use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use env_logger::Env;

mod demos;
mod raytracing;
use raytracing::camera::Camera;
use raytracing::core::Scene;
use raytracing::material::MaterialLibrary;
use raytracing::parser::{ImageData, SceneParser};
use raytracing::render::{
    render_frame, run_animation, CancelToken, FrameSink, ImageFileSink, RenderConfig,
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input path to the scene file
    scene: Option<String>,
    /// render one of the built-in animated scenes instead of a file
    #[arg(long, conflicts_with = "scene")]
    demo: Option<String>,
    /// where the rendered image is saved, the format follows the extension
    #[arg(short, long, default_value = "output.png")]
    output: String,
    /// image width, overrides the scene file
    #[arg(long)]
    width: Option<u32>,
    /// image height, overrides the scene file
    #[arg(long)]
    height: Option<u32>,
    /// the number of rays shot per pixel
    #[arg(short, long, default_value_t = 1)]
    samples: u32,
    /// how many times a ray may bounce
    #[arg(long, default_value_t = raytracing::shading::MAX_DEPTH)]
    max_depth: u32,
    /// number of demo frames to render, numbered after the output name when more than one
    #[arg(long)]
    frames: Option<u64>,
    /// stop the demo animation after this many seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// skip objects whose bounding box the ray misses
    #[arg(long, default_value = "false")]
    bounds: bool,
}

impl Args {
    fn render_config(&self, width: u32, height: u32) -> RenderConfig {
        RenderConfig::default()
            .with_size(self.width.unwrap_or(width), self.height.unwrap_or(height))
            .with_samples(self.samples)
            .with_max_depth(self.max_depth)
    }
}

fn render_scene_file(args: &Args, path: &str, library: &MaterialLibrary) -> anyhow::Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read scene file {path}"))?;
    let base_dir = Path::new(path).parent().unwrap_or(Path::new("."));
    let mut parser = SceneParser::new(&content, library).with_base_dir(base_dir);
    let ImageData {
        width,
        height,
        camera,
        mut scene,
    } = match parser.parse_scene() {
        Ok(data) => data,
        Err(err) => {
            if let Some(location) = err.error_location(&content) {
                log::error!("{path}:\n{location}");
            }
            bail!("cannot parse {path}: {err}");
        }
    };
    scene.set_use_bounds(args.bounds);

    let config = args.render_config(width, height);
    let start = Instant::now();
    let frame = render_frame(&mut scene, &camera, &config);
    log::info!(
        "rendered {}x{} in {:?}",
        config.width,
        config.height,
        start.elapsed()
    );

    ImageFileSink::single(&args.output).present(0, &frame)?;
    log::info!("saved {}", args.output);
    Ok(())
}

fn render_demo(args: &Args, name: &str, library: &MaterialLibrary) -> anyhow::Result<()> {
    let mut director = demos::by_name(name)
        .with_context(|| format!("available demos: {}", demos::NAMES.join(", ")))?;
    let mut scene = Scene::new();
    scene.set_use_bounds(args.bounds);
    let mut camera = Camera::default();
    director.initialize(&mut scene, &mut camera, library)?;

    let cancel = CancelToken::new();
    if let Some(seconds) = args.time_limit {
        let token = cancel.clone();
        let limit = Duration::from_secs_f64(seconds.max(0.0));
        thread::spawn(move || {
            thread::sleep(limit);
            token.cancel();
        });
    }

    // without a time limit an endless animation would never finish
    let frames = match (args.frames, args.time_limit) {
        (Some(frames), _) => Some(frames),
        (None, Some(_)) => None,
        (None, None) => Some(1),
    };
    let mut sink = if frames == Some(1) {
        ImageFileSink::single(&args.output)
    } else {
        ImageFileSink::sequence(&args.output)
    };

    let defaults = RenderConfig::default();
    let config = args.render_config(defaults.width, defaults.height);
    let start = Instant::now();
    let rendered = run_animation(
        director.as_mut(),
        &mut scene,
        &mut camera,
        &config,
        &mut sink,
        &cancel,
        frames,
    )?;
    log::info!(
        "{name}: rendered {rendered} frames in {:?}",
        start.elapsed()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let library = MaterialLibrary::standard();

    match (&args.scene, &args.demo) {
        (Some(path), _) => render_scene_file(&args, path, &library),
        (None, Some(name)) => render_demo(&args, name, &library),
        (None, None) => bail!(
            "nothing to render: pass a scene file or --demo <{}>",
            demos::NAMES.join("|")
        ),
    }
}
