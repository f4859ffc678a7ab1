//! Column split between the CPU (packet) and GPU-path (scalar) backends.
//!
//! The controller owns one number, the CPU share `p` of the image width.
//! After each frame it compares what a column cost on each side and moves
//! `p` a bounded step towards the point where both sides finish together.

use std::time::Duration;

use crate::config::{HybridConfig, RenderMode};

/// A column range of the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// First column, in full-frame coordinates
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn x_end(&self) -> u32 {
        self.x + self.width
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Everything the controller carries between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionState {
    /// Fraction of the width rendered by the CPU backend, in `[0, 1]`
    pub fraction: f32,
    /// Smoothed seconds per column on the CPU backend
    pub cpu_cost: Option<f32>,
    /// Smoothed seconds per column on the GPU-path backend
    pub gpu_cost: Option<f32>,
    /// Frames reported so far
    pub frame: u64,
}

#[derive(Debug, Clone)]
pub struct HybridPartitionController {
    config: HybridConfig,
    mode: RenderMode,
    state: PartitionState,
    /// Fraction to restore when switching back to hybrid mode
    hybrid_fraction: f32,
    width: u32,
    height: u32,
}

impl HybridPartitionController {
    pub fn new(config: HybridConfig, mode: RenderMode, width: u32, height: u32) -> Self {
        let initial = sanitize(config.initial_partition, 0.5);
        let mut controller = Self {
            config,
            mode,
            state: PartitionState {
                fraction: initial,
                cpu_cost: None,
                gpu_cost: None,
                frame: 0,
            },
            hybrid_fraction: initial,
            width,
            height,
        };
        controller.apply_mode();
        controller
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn state(&self) -> &PartitionState {
        &self.state
    }

    pub fn fraction(&self) -> f32 {
        self.state.fraction
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Switch backends. The hybrid fraction survives trips through the
    /// single-backend modes.
    pub fn set_mode(&mut self, mode: RenderMode) {
        if self.mode == RenderMode::Hybrid {
            self.hybrid_fraction = self.state.fraction;
        }
        self.mode = mode;
        self.apply_mode();
        log::info!("Render mode {:?}, CPU share {:.3}", mode, self.state.fraction);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Column ranges for `(cpu, gpu)`; their widths always sum to the
    /// frame width.
    pub fn viewports(&self) -> (Viewport, Viewport) {
        let cpu_width = ((self.state.fraction * self.width as f32).round() as u32).min(self.width);
        let cpu = Viewport {
            x: 0,
            width: cpu_width,
            height: self.height,
        };
        let gpu = Viewport {
            x: cpu_width,
            width: self.width - cpu_width,
            height: self.height,
        };
        (cpu, gpu)
    }

    /// Feed back one frame's timings. Returns true if the column split
    /// changed.
    ///
    /// A backend that rendered no columns keeps its previous cost estimate.
    pub fn update(&mut self, cpu_time: Duration, gpu_time: Duration) -> bool {
        self.state.frame += 1;
        if self.mode != RenderMode::Hybrid {
            return false;
        }

        let (cpu, gpu) = self.viewports();
        let smoothing = self.config.smoothing.clamp(0.0, 1.0);
        if cpu.width > 0 {
            let cost = cpu_time.as_secs_f32() / cpu.width as f32;
            self.state.cpu_cost = Some(smooth(self.state.cpu_cost, cost, smoothing));
        }
        if gpu.width > 0 {
            let cost = gpu_time.as_secs_f32() / gpu.width as f32;
            self.state.gpu_cost = Some(smooth(self.state.gpu_cost, cost, smoothing));
        }

        let current = self.state.fraction;
        let target = match (self.state.cpu_cost, self.state.gpu_cost) {
            // Both finish together when p·c_cpu = (1-p)·c_gpu
            (Some(c), Some(g)) if c + g > 0.0 => g / (c + g),
            (Some(_), Some(_)) => current,
            // Hand columns to the side that has never been measured
            (Some(_), None) => 0.0,
            (None, Some(_)) => 1.0,
            (None, None) => current,
        };

        let max_step = sanitize(self.config.max_step, 0.0);
        let step = (target - current).clamp(-max_step, max_step);
        self.state.fraction = (current + step).clamp(0.0, 1.0);
        self.hybrid_fraction = self.state.fraction;

        let changed = self.viewports().0.width != cpu.width;
        if changed {
            log::debug!(
                "Partition {:.3} -> {:.3} (cpu {:?}/col, gpu {:?}/col)",
                current,
                self.state.fraction,
                self.state.cpu_cost,
                self.state.gpu_cost
            );
        }
        changed
    }

    fn apply_mode(&mut self) {
        self.state.fraction = match self.mode {
            RenderMode::Cpu => 1.0,
            RenderMode::Gpu => 0.0,
            RenderMode::Hybrid => self.hybrid_fraction,
        };
    }
}

/// Exponential moving average; the first sample is taken as is.
fn smooth(previous: Option<f32>, sample: f32, weight: f32) -> f32 {
    match previous {
        Some(previous) => previous + weight * (sample - previous),
        None => sample,
    }
}

/// Clamp a configured fraction into `[0, 1]`, replacing NaN.
fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}
