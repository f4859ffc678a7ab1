//! Frame driver: splits each frame between the two backends, runs them
//! side by side and composes the result.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use re_core::{Color, Scene};

use crate::backend::{PacketBackend, RenderBackend, ScalarBackend};
use crate::config::{RenderMode, RenderSettings};
use crate::context::PrimaryRays;
use crate::engine::RayCastEngine;
use crate::hybrid::{HybridPartitionController, Viewport};

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit RGBA, clamping out-of-range channels.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * linear_to_gamma(color.x).clamp(0.0, 1.0)) as u8;
    let g = (255.0 * linear_to_gamma(color.y).clamp(0.0, 1.0)) as u8;
    let b = (255.0 * linear_to_gamma(color.z).clamp(0.0, 1.0)) as u8;
    [r, g, b, 255]
}

/// Row-major image of linear colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ColorBuffer {
    /// Create a new buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Reallocate for new dimensions if they changed.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy `source` into this buffer with its column 0 at column `x`.
    ///
    /// Rows and columns that fall outside this buffer are dropped.
    pub fn blit_columns(&mut self, source: &ColorBuffer, x: u32) {
        if x >= self.width {
            return;
        }
        let columns = source.width.min(self.width - x) as usize;
        let rows = source.height.min(self.height);
        for y in 0..rows {
            let src = (y * source.width) as usize;
            let dst = (y * self.width + x) as usize;
            self.pixels[dst..dst + columns].copy_from_slice(&source.pixels[src..src + columns]);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// Timing and split of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub mode: RenderMode,
    pub cpu_time: Duration,
    pub gpu_time: Duration,
    /// Wall time for the whole frame, including composition
    pub total_time: Duration,
    pub cpu_columns: u32,
    pub gpu_columns: u32,
    /// CPU share used for the next frame
    pub next_partition: f32,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {} [{:?}] {:.2?} total | cpu {} cols {:.2?} | gpu {} cols {:.2?} | next split {:.3}",
            self.frame,
            self.mode,
            self.total_time,
            self.cpu_columns,
            self.cpu_time,
            self.gpu_columns,
            self.gpu_time,
            self.next_partition
        )
    }
}

/// Renders frames across a CPU and a GPU-path backend.
pub struct HybridRenderer {
    cpu: Box<dyn RenderBackend>,
    gpu: Box<dyn RenderBackend>,
    controller: HybridPartitionController,
    cpu_buffer: ColorBuffer,
    gpu_buffer: ColorBuffer,
    output: ColorBuffer,
}

impl HybridRenderer {
    pub fn new(cpu: Box<dyn RenderBackend>, gpu: Box<dyn RenderBackend>, controller: HybridPartitionController) -> Self {
        let output = ColorBuffer::new(controller.width(), controller.height());
        let mut renderer = Self {
            cpu,
            gpu,
            controller,
            cpu_buffer: ColorBuffer::new(0, 0),
            gpu_buffer: ColorBuffer::new(0, 0),
            output,
        };
        renderer.sync_buffers();
        renderer
    }

    /// Packet backend over `cpu_engine`, scalar backend over `gpu_engine`.
    pub fn from_settings<C, G>(settings: &RenderSettings, cpu_engine: C, gpu_engine: G) -> Self
    where
        C: RayCastEngine + 'static,
        G: RayCastEngine + 'static,
    {
        log::info!(
            "Hybrid renderer {}x{}, mode {:?}, {} reflections",
            settings.width,
            settings.height,
            settings.mode,
            settings.tracer.max_reflections
        );
        Self::new(
            Box::new(PacketBackend::new(cpu_engine, &settings.tracer, settings.bucket_size)),
            Box::new(ScalarBackend::new(gpu_engine, &settings.tracer)),
            HybridPartitionController::new(settings.hybrid.clone(), settings.mode, settings.width, settings.height),
        )
    }

    pub fn controller(&self) -> &HybridPartitionController {
        &self.controller
    }

    pub fn mode(&self) -> RenderMode {
        self.controller.mode()
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.controller.set_mode(mode);
        self.sync_buffers();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        log::info!("Resizing renderer to {}x{}", width, height);
        self.controller.resize(width, height);
        self.output.resize(width, height);
        self.sync_buffers();
    }

    /// The most recently composed frame.
    pub fn output(&self) -> &ColorBuffer {
        &self.output
    }

    /// Render one frame of `scene` and rebalance for the next.
    ///
    /// The scene must have passed [`Scene::validate`] and match the scene
    /// both engines were built from.
    pub fn render(&mut self, scene: &Scene) -> FrameStats {
        let start = Instant::now();
        let (cpu_view, gpu_view) = self.controller.viewports();
        let rays = PrimaryRays::new(&scene.camera, self.controller.width(), self.controller.height());

        if self.controller.state().frame == 0 {
            self.cpu.check_scene(scene);
        }

        let Self {
            cpu,
            gpu,
            cpu_buffer,
            gpu_buffer,
            ..
        } = self;
        let (cpu, gpu): (&dyn RenderBackend, &dyn RenderBackend) = (&**cpu, &**gpu);

        let (cpu_time, gpu_time) = thread::scope(|s| {
            let cpu_job = s.spawn(|| run_backend(cpu, scene, &rays, cpu_view, cpu_buffer));
            let gpu_time = run_backend(gpu, scene, &rays, gpu_view, gpu_buffer);
            let cpu_time = cpu_job.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (cpu_time, gpu_time)
        });

        self.output.blit_columns(&self.cpu_buffer, cpu_view.x);
        self.output.blit_columns(&self.gpu_buffer, gpu_view.x);

        let frame = self.controller.state().frame;
        if self.controller.update(cpu_time, gpu_time) {
            self.sync_buffers();
        }

        FrameStats {
            frame,
            mode: self.controller.mode(),
            cpu_time,
            gpu_time,
            total_time: start.elapsed(),
            cpu_columns: cpu_view.width,
            gpu_columns: gpu_view.width,
            next_partition: self.controller.fraction(),
        }
    }

    /// Size each backend's buffer to its current viewport.
    fn sync_buffers(&mut self) {
        let (cpu_view, gpu_view) = self.controller.viewports();
        self.cpu_buffer.resize(cpu_view.width, cpu_view.height);
        self.gpu_buffer.resize(gpu_view.width, gpu_view.height);
    }
}

fn run_backend(
    backend: &dyn RenderBackend,
    scene: &Scene,
    rays: &PrimaryRays,
    viewport: Viewport,
    target: &mut ColorBuffer,
) -> Duration {
    if viewport.is_empty() {
        return Duration::ZERO;
    }
    let start = Instant::now();
    backend.render(scene, rays, viewport, target);
    let elapsed = start.elapsed();
    log::trace!("{} backend: {} columns in {:.2?}", backend.name(), viewport.width, elapsed);
    elapsed
}
