//! Per-frame, read-only view of the scene handed to every tracer call.

use re_core::{Camera, Color, Light, Scene, Texture};
use re_math::{Vec2, Vec3};

use crate::engine::RayCastEngine;
use crate::ray::Ray;

/// Everything a tracer needs for one frame on one backend.
///
/// Borrowed from the scene and the backend's engine; nothing writes to
/// either while a context is alive.
#[derive(Clone, Copy)]
pub struct SceneContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub ambient: Color,
    pub lights: &'a [Light],
    pub sky: &'a Texture,
    pub engine: &'a dyn RayCastEngine,
}

impl<'a> SceneContext<'a> {
    pub fn new(scene: &'a Scene, engine: &'a dyn RayCastEngine) -> Self {
        Self {
            scene,
            camera: &scene.camera,
            ambient: scene.ambient,
            lights: scene.lights(),
            sky: &scene.sky,
            engine,
        }
    }

    /// Sky colour seen along `direction`.
    pub fn sky(&self, direction: Vec3) -> Color {
        self.sky.sample(sky_uv(direction))
    }
}

/// Equirectangular lookup for a view direction.
///
/// `u` follows the azimuth around +Y (starting at -Z), `v` runs from 0
/// straight down to 1 straight up.
pub fn sky_uv(direction: Vec3) -> Vec2 {
    let d = direction.normalize_or_zero();
    let theta = d.x.atan2(d.z);
    let phi = std::f32::consts::FRAC_PI_2 - d.y.clamp(-1.0, 1.0).acos();
    Vec2::new(
        (theta + std::f32::consts::PI) / std::f32::consts::TAU,
        0.5 * (1.0 + phi.sin()),
    )
}

/// Primary ray generator for a full frame.
///
/// Rays are addressed in full-frame pixel coordinates, so backends that
/// render different column ranges still agree on every pixel.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryRays {
    origin: Vec3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    width: u32,
    height: u32,
}

impl PrimaryRays {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let scale = camera.fov_scale();
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self {
            origin: camera.position,
            right: camera.xaxis * aspect * scale,
            up: camera.yaxis * scale,
            forward: camera.zaxis,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Ray through the centre of pixel `(x, y)`, row 0 at the top.
    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let nx = 2.0 * (x as f32 + 0.5) / self.width as f32 - 1.0;
        let ny = 2.0 * (y as f32 + 0.5) / self.height as f32 - 1.0;
        let direction = (self.right * nx - self.up * ny + self.forward).normalize();
        Ray::new(self.origin, direction)
    }
}
