//! Render settings.
//!
//! Every struct defaults field by field, so a settings file only needs the
//! values it wants to change:
//!
//! ```json
//! { "width": 1280, "mode": "hybrid", "tracer": { "max_reflections": 4 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::DEFAULT_BUCKET_SIZE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Number of light slots a ray packet evaluates per hit.
///
/// Packets keep one shadow batch per slot, so the budget is a fixed set of
/// sizes rather than an arbitrary count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchLightBudget {
    One,
    Two,
    Four,
    #[default]
    Eight,
    Sixteen,
}

impl BatchLightBudget {
    pub fn slots(self) -> usize {
        match self {
            BatchLightBudget::One => 1,
            BatchLightBudget::Two => 2,
            BatchLightBudget::Four => 4,
            BatchLightBudget::Eight => 8,
            BatchLightBudget::Sixteen => 16,
        }
    }
}

/// Shading and recursion constants shared by the scalar and packet tracers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Mirror bounces after the primary hit; 0 disables reflection.
    pub max_reflections: u32,
    /// Flat weight applied to every reflected contribution.
    pub reflection_coefficient: f32,
    /// Start offset of shadow and reflection rays.
    pub ray_epsilon: f32,
    /// Lights evaluated per scalar hit; `None` evaluates all of them.
    pub max_lights_per_hit: Option<usize>,
    pub batch_light_budget: BatchLightBudget,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_reflections: 2,
            reflection_coefficient: 0.25,
            ray_epsilon: 0.01,
            max_lights_per_hit: None,
            batch_light_budget: BatchLightBudget::default(),
        }
    }
}

/// Tuning for the CPU/GPU column split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Share of the image width given to the CPU path on the first frame.
    pub initial_partition: f32,
    /// Largest change of the partition per frame.
    pub max_step: f32,
    /// Weight of the newest frame in the per-column cost averages.
    pub smoothing: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            initial_partition: 0.5,
            max_step: 0.05,
            smoothing: 0.25,
        }
    }
}

/// Which backends produce the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Whole frame on the packet (CPU) backend
    Cpu,
    /// Whole frame on the scalar (GPU-path) backend
    Gpu,
    /// Columns split between both, rebalanced every frame
    #[default]
    Hybrid,
}

/// Top-level settings for a render session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Frames to render before exiting (headless runs)
    pub frames: u32,
    pub mode: RenderMode,
    /// Edge length of the square tiles the packet backend schedules.
    pub bucket_size: u32,
    pub tracer: TracerConfig,
    pub hybrid: HybridConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frames: 30,
            mode: RenderMode::default(),
            bucket_size: DEFAULT_BUCKET_SIZE,
            tracer: TracerConfig::default(),
            hybrid: HybridConfig::default(),
        }
    }
}

impl RenderSettings {
    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&text)?;
        log::info!("Loaded render settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
