use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::camera::Camera;
use super::core::Scene;
use super::error::{RenderError, RenderResult, SceneResult};
use super::material::MaterialLibrary;
use super::shading::{gamma_correct, shade, MAX_DEPTH};
use super::Color;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Jittered samples averaged per pixel; 1 shoots through the pixel center
    pub samples_per_pixel: u32,
    /// Deepest reflection/refraction bounce evaluated
    pub max_depth: u32,
    /// Color returned by rays that hit nothing
    pub background: Color,
    /// Seed for the sub-pixel jitter
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            samples_per_pixel: 1,
            max_depth: MAX_DEPTH,
            background: Color::zero(),
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn with_size(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn with_samples(self, samples_per_pixel: u32) -> Self {
        Self {
            samples_per_pixel: samples_per_pixel.max(1),
            ..self
        }
    }

    pub fn with_max_depth(self, max_depth: u32) -> Self {
        Self { max_depth, ..self }
    }

    pub fn with_background(self, background: Color) -> Self {
        Self { background, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}

/// RGBA8 pixels in row-major order, `stride` bytes per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Frame {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let start = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.pixels[start..start + BYTES_PER_PIXEL]);
        pixel
    }
}

/// Gamma corrects a linear color and quantizes it to opaque RGBA8.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let corrected = gamma_correct(color);
    let quantize = |channel: f64| (255.0 * channel.clamp(0.0, 1.0)).round() as u8;
    [
        quantize(corrected.x),
        quantize(corrected.y),
        quantize(corrected.z),
        255,
    ]
}

/// Linear color of one pixel, averaged over the configured samples.
pub fn render_pixel(
    scene: &Scene,
    camera: &Camera,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut impl Rng,
) -> Color {
    if config.samples_per_pixel <= 1 {
        let ray = camera.ray_for_pixel(x, y, config.width, config.height);
        return shade(scene, &ray, 0, config);
    }

    let mut color = Color::zero();
    for _ in 0..config.samples_per_pixel {
        let px = x as f64 + rng.gen_range(0.0..1.0);
        let py = y as f64 + rng.gen_range(0.0..1.0);
        let ray = camera.ray_through(px, py, config.width, config.height);
        color += shade(scene, &ray, 0, config);
    }
    color / config.samples_per_pixel as f64
}

/// Renders into `frame`, one scanline per rayon task. The scene must already be committed.
pub fn render_into(scene: &Scene, camera: &Camera, config: &RenderConfig, frame: &mut Frame) {
    let stride = frame.stride();
    if stride == 0 {
        return;
    }
    frame
        .pixels
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            // every row owns its generator so the output doesn't depend on scheduling
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(y as u64));
            for (x, pixel) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let color = render_pixel(scene, camera, x as u32, y as u32, config, &mut rng);
                pixel.copy_from_slice(&color_to_rgba(color));
            }
        });
}

/// Commits pending scene changes, then renders a whole frame in parallel.
pub fn render_frame(scene: &mut Scene, camera: &Camera, config: &RenderConfig) -> Frame {
    scene.commit();
    let scene: &Scene = scene;

    let start = Instant::now();
    let mut frame = Frame::new(config.width, config.height);
    render_into(scene, camera, config, &mut frame);
    log::debug!(
        "rendered {}x{} ({} objects, {} lights) in {:?}",
        config.width,
        config.height,
        scene.objects().len(),
        scene.lights().len(),
        start.elapsed()
    );
    frame
}

/// Shared flag asking an animation loop to stop before its next frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives finished frames.
pub trait FrameSink {
    fn present(&mut self, index: u64, frame: &Frame) -> RenderResult<()>;
}

/// Writes frames as image files; the format follows the path's extension.
#[derive(Debug, Clone)]
pub struct ImageFileSink {
    path: PathBuf,
    numbered: bool,
}

impl ImageFileSink {
    /// Every frame overwrites `path`.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            numbered: false,
        }
    }

    /// Frame `n` of `out.png` goes to `out_0000n.png`.
    pub fn sequence(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            numbered: true,
        }
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        if !self.numbered {
            return self.path.clone();
        }
        let stem = self
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        let name = match self.path.extension() {
            Some(extension) => format!("{stem}_{index:05}.{}", extension.to_string_lossy()),
            None => format!("{stem}_{index:05}"),
        };
        self.path.with_file_name(name)
    }
}

impl FrameSink for ImageFileSink {
    fn present(&mut self, index: u64, frame: &Frame) -> RenderResult<()> {
        let path = self.frame_path(index);
        save_frame(frame, &path)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

pub fn save_frame(frame: &Frame, path: &Path) -> RenderResult<()> {
    let (width, height) = (frame.width(), frame.height());
    let len = frame.as_bytes().len();
    let buffer = image::RgbaImage::from_raw(width, height, frame.as_bytes().to_vec())
        .ok_or(RenderError::BufferSize { width, height, len })?;
    buffer.save(path)?;
    Ok(())
}

/// Owns the content of a scene and how it changes between frames.
pub trait SceneDirector {
    fn name(&self) -> &str;

    /// Populates an empty scene and positions the camera.
    fn initialize(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        library: &MaterialLibrary,
    ) -> SceneResult<()>;

    /// Moves things around before frame `frame` is rendered.
    fn update(&mut self, _scene: &mut Scene, _camera: &mut Camera, _frame: u64, _delta_time: f64) {}

    fn is_animated(&self) -> bool {
        true
    }
}

/// Update/render/present loop.
///
/// Cancellation is checked before each frame starts, never during one. Stops
/// after `max_frames` frames when given, and after the first frame for
/// directors that aren't animated. Returns the number of frames presented.
pub fn run_animation(
    director: &mut dyn SceneDirector,
    scene: &mut Scene,
    camera: &mut Camera,
    config: &RenderConfig,
    sink: &mut dyn FrameSink,
    cancel: &CancelToken,
    max_frames: Option<u64>,
) -> RenderResult<u64> {
    let mut frame_index = 0;
    let mut last_frame: Option<Instant> = None;
    loop {
        if cancel.is_cancelled() {
            log::info!("{}: cancelled after {frame_index} frames", director.name());
            break;
        }
        if max_frames.is_some_and(|max| frame_index >= max) {
            break;
        }

        let delta_time = last_frame.map_or(0.0, |last| last.elapsed().as_secs_f64());
        last_frame = Some(Instant::now());

        director.update(scene, camera, frame_index, delta_time);
        let frame = render_frame(scene, camera, config);
        sink.present(frame_index, &frame)?;
        frame_index += 1;

        if !director.is_animated() {
            break;
        }
    }
    Ok(frame_index)
}
