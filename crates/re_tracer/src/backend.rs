//! The two render backends the hybrid renderer splits a frame between.
//!
//! Each backend owns its ray-cast engine and renders a column range of the
//! frame into its own buffer. They share nothing mutable, so both can run
//! at the same time.

use rayon::prelude::*;
use re_core::{Color, Scene};

use crate::bucket::{generate_buckets, Bucket, BucketResult};
use crate::config::TracerConfig;
use crate::context::{PrimaryRays, SceneContext};
use crate::engine::RayCastEngine;
use crate::hybrid::Viewport;
use crate::packet::{lane_offset, PacketTracer, PACKET_HEIGHT, PACKET_WIDTH};
use crate::ray::PACKET_SIZE;
use crate::recursive::RecursiveTracer;
use crate::renderer::ColorBuffer;

pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render `viewport` of the frame described by `rays` into `target`.
    ///
    /// `target` is `viewport.width x viewport.height`, with column 0 being
    /// frame column `viewport.x`.
    fn render(&self, scene: &Scene, rays: &PrimaryRays, viewport: Viewport, target: &mut ColorBuffer);

    /// Called once per frame before rendering, for warnings about the scene.
    fn check_scene(&self, _scene: &Scene) {}
}

/// CPU path: rayon over buckets, 4x2 packets inside each bucket.
pub struct PacketBackend<E> {
    engine: E,
    tracer: PacketTracer,
    bucket_size: u32,
}

impl<E: RayCastEngine> PacketBackend<E> {
    pub fn new(engine: E, config: &TracerConfig, bucket_size: u32) -> Self {
        Self {
            engine,
            tracer: PacketTracer::new(config),
            bucket_size,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Render a single bucket, packet by packet.
    fn render_bucket(&self, ctx: &SceneContext<'_>, rays: &PrimaryRays, bucket: &Bucket) -> BucketResult {
        let mut pixels = vec![Color::ZERO; bucket.pixel_count() as usize];
        let mut out = [Color::ZERO; PACKET_SIZE];

        for y in (bucket.y..bucket.y_end()).step_by(PACKET_HEIGHT as usize) {
            for x in (bucket.x..bucket.x_end()).step_by(PACKET_WIDTH as usize) {
                let (mut batch, mask) = PacketTracer::primary_packet(rays, x, y, bucket.x_end(), bucket.y_end());
                self.tracer.trace_primary(ctx, &mut batch, &mask, &mut out);

                for lane in mask.lanes() {
                    let (dx, dy) = lane_offset(lane);
                    let local = (y + dy - bucket.y) * bucket.width + (x + dx - bucket.x);
                    pixels[local as usize] = out[lane];
                }
            }
        }

        BucketResult::new(*bucket, pixels)
    }
}

impl<E: RayCastEngine> RenderBackend for PacketBackend<E> {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn render(&self, scene: &Scene, rays: &PrimaryRays, viewport: Viewport, target: &mut ColorBuffer) {
        let ctx = SceneContext::new(scene, &self.engine);
        let buckets = generate_buckets(viewport, self.bucket_size);

        let results: Vec<BucketResult> = buckets
            .par_iter()
            .map(|bucket| self.render_bucket(&ctx, rays, bucket))
            .collect();

        for result in results {
            let bucket = result.bucket;
            for (row, line) in result.pixels.chunks_exact(bucket.width as usize).enumerate() {
                for (col, color) in line.iter().enumerate() {
                    target.set(bucket.x - viewport.x + col as u32, bucket.y + row as u32, *color);
                }
            }
        }
    }

    fn check_scene(&self, scene: &Scene) {
        let ctx = SceneContext::new(scene, &self.engine);
        if self.tracer.exceeds_light_budget(&ctx) {
            log::warn!(
                "Scene '{}' has {} lights; packets evaluate only the first {}",
                scene.name,
                scene.lights().len(),
                self.tracer.lights(&ctx).len()
            );
        }
    }
}

/// GPU path: one independent scalar trace per pixel, rows in parallel.
pub struct ScalarBackend<E> {
    engine: E,
    tracer: RecursiveTracer,
}

impl<E: RayCastEngine> ScalarBackend<E> {
    pub fn new(engine: E, config: &TracerConfig) -> Self {
        Self {
            engine,
            tracer: RecursiveTracer::new(config),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: RayCastEngine> RenderBackend for ScalarBackend<E> {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn render(&self, scene: &Scene, rays: &PrimaryRays, viewport: Viewport, target: &mut ColorBuffer) {
        if viewport.is_empty() {
            return;
        }
        let ctx = SceneContext::new(scene, &self.engine);

        target
            .pixels
            .par_chunks_mut(viewport.width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (col, pixel) in row.iter_mut().enumerate() {
                    *pixel = self.tracer.trace_primary(&ctx, rays.ray(viewport.x + col as u32, y as u32));
                }
            });
    }
}
