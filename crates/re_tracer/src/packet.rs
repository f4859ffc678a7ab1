//! Packet tracer: the scalar algorithm run over [`PACKET_SIZE`] lanes at
//! once, with one batched engine query per step instead of one per ray.
//!
//! Each lane goes through exactly the same shading calls, in the same
//! order, as [`RecursiveTracer`](crate::RecursiveTracer) would make for it,
//! so the two produce the same colours.

use re_core::{Color, Light};

use crate::config::TracerConfig;
use crate::context::{PrimaryRays, SceneContext};
use crate::ray::{LaneMask, RayBatch, PACKET_SIZE};
use crate::shading::{HitRecord, LightProbe, ShadingEvaluator};

/// Pixel columns covered by one packet.
pub const PACKET_WIDTH: u32 = 4;
/// Pixel rows covered by one packet.
pub const PACKET_HEIGHT: u32 = 2;

/// Pixel offset of `lane` inside its 4x2 tile.
#[inline]
pub fn lane_offset(lane: usize) -> (u32, u32) {
    (lane as u32 % PACKET_WIDTH, lane as u32 / PACKET_WIDTH)
}

#[derive(Debug, Clone)]
pub struct PacketTracer {
    shading: ShadingEvaluator,
    max_reflections: u32,
    reflection_coefficient: f32,
    light_slots: usize,
}

impl PacketTracer {
    pub fn new(config: &TracerConfig) -> Self {
        Self {
            shading: ShadingEvaluator::new(config),
            max_reflections: config.max_reflections,
            reflection_coefficient: config.reflection_coefficient,
            light_slots: config.batch_light_budget.slots(),
        }
    }

    /// Lights evaluated per packet, capped by the batch light budget.
    pub fn lights<'a>(&self, ctx: &SceneContext<'a>) -> &'a [Light] {
        let lights = self.shading.lights(ctx);
        &lights[..self.light_slots.min(lights.len())]
    }

    /// True when the scene has more lights than a packet will evaluate.
    pub fn exceeds_light_budget(&self, ctx: &SceneContext<'_>) -> bool {
        self.shading.lights(ctx).len() > self.light_slots
    }

    /// Camera rays for the 4x2 tile whose top-left pixel is `(x, y)`.
    ///
    /// Lanes that fall outside `x..x_end` or `y..y_end` are masked off.
    pub fn primary_packet(rays: &PrimaryRays, x: u32, y: u32, x_end: u32, y_end: u32) -> (RayBatch, LaneMask) {
        let mut batch = RayBatch::default();
        let mut mask = LaneMask::NONE;
        for lane in 0..PACKET_SIZE {
            let (dx, dy) = lane_offset(lane);
            let (px, py) = (x + dx, y + dy);
            if px < x_end && py < y_end {
                batch.set_ray(lane, &rays.ray(px, py));
                mask.set(lane, true);
            }
        }
        (batch, mask)
    }

    /// Intersect camera rays and trace them from depth 0.
    pub fn trace_primary(
        &self,
        ctx: &SceneContext<'_>,
        batch: &mut RayBatch,
        mask: &LaneMask,
        out: &mut [Color; PACKET_SIZE],
    ) {
        ctx.engine.intersect_batch(batch, mask);
        self.trace(ctx, batch, mask, 0, out);
    }

    /// Colours for the lanes of an already-intersected batch.
    ///
    /// Only lanes selected by `mask` are read from `batch` or written to
    /// `out`.
    pub fn trace(
        &self,
        ctx: &SceneContext<'_>,
        batch: &RayBatch,
        mask: &LaneMask,
        depth: u32,
        out: &mut [Color; PACKET_SIZE],
    ) {
        let mut hits: [Option<HitRecord<'_>>; PACKET_SIZE] = [None; PACKET_SIZE];
        let mut surfaces = LaneMask::NONE;

        for lane in mask.lanes() {
            if batch.is_hit(lane) {
                hits[lane] = Some(self.shading.resolve_hit(ctx, &batch.ray(lane)));
                surfaces.set(lane, true);
            } else {
                out[lane] = self
                    .shading
                    .shade_miss(ctx, batch.direction(lane), batch.transmittance[lane]);
            }
        }

        if !surfaces.any() {
            return;
        }

        for light in self.lights(ctx) {
            self.accumulate_light(ctx, &mut hits, &surfaces, light);
        }

        for lane in surfaces.lanes() {
            if let Some(hit) = &hits[lane] {
                out[lane] = self.shading.shade(ctx, hit) + batch.transmittance[lane];
            }
        }

        if depth < self.max_reflections {
            let mut reflected = RayBatch::default();
            for lane in surfaces.lanes() {
                if let Some(hit) = &hits[lane] {
                    reflected.set_ray(lane, &self.shading.reflection_ray(&batch.ray(lane), hit));
                }
            }
            ctx.engine.intersect_batch(&mut reflected, &surfaces);

            let mut bounce = [Color::ZERO; PACKET_SIZE];
            self.trace(ctx, &reflected, &surfaces, depth + 1, &mut bounce);
            for lane in surfaces.lanes() {
                out[lane] += self.reflection_coefficient * bounce[lane];
            }
        }
    }

    /// One light slot: a single shadow batch for every in-range lane.
    fn accumulate_light(
        &self,
        ctx: &SceneContext<'_>,
        hits: &mut [Option<HitRecord<'_>>; PACKET_SIZE],
        surfaces: &LaneMask,
        light: &Light,
    ) {
        let mut shadow = RayBatch::default();
        let mut probes: [Option<LightProbe>; PACKET_SIZE] = [None; PACKET_SIZE];
        let mut in_range = LaneMask::NONE;

        for lane in surfaces.lanes() {
            let Some(hit) = &hits[lane] else { continue };
            if let Some(probe) = self.shading.light_probe(hit, light) {
                shadow.set_ray(lane, &probe.shadow_ray);
                probes[lane] = Some(probe);
                in_range.set(lane, true);
            }
        }

        if !in_range.any() {
            return;
        }

        let occluded = ctx.engine.occluded_batch(&shadow, &in_range);
        for lane in in_range.lanes() {
            if occluded[lane] {
                continue;
            }
            if let (Some(hit), Some(probe)) = (hits[lane].as_mut(), probes[lane].as_ref()) {
                self.shading.apply_light(hit, light, probe);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BvhEngine;
    use crate::config::BatchLightBudget;
    use crate::engine::RayCastEngine;
    use crate::ray::Ray;
    use crate::test_scenes::{mirror_pair, showcase};
    use crate::RecursiveTracer;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use re_math::Vec3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn random_ray(rng: &mut StdRng) -> Ray {
        let origin = Vec3::new(rng.gen_range(-4.0..4.0), rng.gen_range(0.2..4.0), rng.gen_range(-4.0..6.0));
        let mut direction = Vec3::ZERO;
        while direction.length_squared() < 1e-4 {
            direction = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..0.6), rng.gen_range(-1.0..1.0));
        }
        Ray::new(origin, direction.normalize())
    }

    fn assert_lanes_match(packet: &[Color; PACKET_SIZE], scalar: &[Color; PACKET_SIZE], mask: &LaneMask) {
        for lane in mask.lanes() {
            assert!(
                packet[lane].abs_diff_eq(scalar[lane], 1e-5),
                "lane {lane}: packet {} != scalar {}",
                packet[lane],
                scalar[lane]
            );
        }
    }

    #[test]
    fn test_packet_matches_scalar_on_random_rays() {
        let scene = showcase();
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let config = TracerConfig {
            max_reflections: 3,
            ..Default::default()
        };
        let packet = PacketTracer::new(&config);
        let scalar = RecursiveTracer::new(&config);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let mask = LaneMask::from_fn(|_| rng.gen_bool(0.8));
            let mut batch = RayBatch::default();
            let mut expected = [Color::ZERO; PACKET_SIZE];
            for lane in mask.lanes() {
                let ray = random_ray(&mut rng);
                batch.set_ray(lane, &ray);
                expected[lane] = scalar.trace_primary(&ctx, ray);
            }

            let mut out = [Color::ZERO; PACKET_SIZE];
            packet.trace_primary(&ctx, &mut batch, &mask, &mut out);

            assert_lanes_match(&out, &expected, &mask);
        }
    }

    #[test]
    fn test_camera_packets_match_scalar() {
        let scene = showcase();
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let config = TracerConfig::default();
        let packet = PacketTracer::new(&config);
        let scalar = RecursiveTracer::new(&config);
        let rays = PrimaryRays::new(&scene.camera, 22, 13);

        for y in (0..13).step_by(PACKET_HEIGHT as usize) {
            for x in (0..22).step_by(PACKET_WIDTH as usize) {
                let (mut batch, mask) = PacketTracer::primary_packet(&rays, x, y, 22, 13);
                let mut out = [Color::ZERO; PACKET_SIZE];
                packet.trace_primary(&ctx, &mut batch, &mask, &mut out);

                let mut expected = [Color::ZERO; PACKET_SIZE];
                for lane in mask.lanes() {
                    let (dx, dy) = lane_offset(lane);
                    expected[lane] = scalar.trace_primary(&ctx, rays.ray(x + dx, y + dy));
                }
                assert_lanes_match(&out, &expected, &mask);
            }
        }
    }

    #[test]
    fn test_primary_packet_masks_edges() {
        let rays = PrimaryRays::new(&re_core::Camera::default(), 6, 3);

        let (_, full) = PacketTracer::primary_packet(&rays, 0, 0, 6, 3);
        assert_eq!(full, LaneMask::ALL);

        // Two columns and one row left
        let (batch, corner) = PacketTracer::primary_packet(&rays, 4, 2, 6, 3);
        assert_eq!(corner.lanes().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(batch.ray(1), rays.ray(5, 2));
    }

    #[test]
    fn test_invalid_lanes_untouched() {
        let scene = showcase();
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let packet = PacketTracer::new(&TracerConfig::default());
        let rays = PrimaryRays::new(&scene.camera, 8, 8);

        let (mut batch, _) = PacketTracer::primary_packet(&rays, 2, 4, 8, 8);
        let mask = LaneMask::from_fn(|lane| lane == 1 || lane == 6);
        let sentinel = Color::new(-1.0, -2.0, -3.0);
        let mut out = [sentinel; PACKET_SIZE];

        let before = batch.clone();
        packet.trace_primary(&ctx, &mut batch, &mask, &mut out);

        for lane in 0..PACKET_SIZE {
            if mask.is_set(lane) {
                assert_ne!(out[lane], sentinel);
            } else {
                assert_eq!(out[lane], sentinel);
                assert_eq!(batch.ray(lane), before.ray(lane));
            }
        }
    }

    #[test]
    fn test_empty_mask_is_a_no_op() {
        let scene = mirror_pair();
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let packet = PacketTracer::new(&TracerConfig::default());

        let mut batch = RayBatch::default();
        let mut out = [Color::ONE; PACKET_SIZE];
        packet.trace_primary(&ctx, &mut batch, &LaneMask::NONE, &mut out);

        assert_eq!(out, [Color::ONE; PACKET_SIZE]);
    }

    #[test]
    fn test_light_budget_caps_packet_lights() {
        let scene = showcase();
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);

        let packet = PacketTracer::new(&TracerConfig {
            batch_light_budget: BatchLightBudget::One,
            ..Default::default()
        });
        assert!(packet.exceeds_light_budget(&ctx));
        assert_eq!(packet.lights(&ctx).len(), 1);

        // Same image as a scalar tracer capped to the first light
        let scalar = RecursiveTracer::new(&TracerConfig {
            max_lights_per_hit: Some(1),
            ..Default::default()
        });
        let rays = PrimaryRays::new(&scene.camera, 8, 4);
        for y in (0..4).step_by(2) {
            for x in (0..8).step_by(4) {
                let (mut batch, mask) = PacketTracer::primary_packet(&rays, x, y, 8, 4);
                let mut out = [Color::ZERO; PACKET_SIZE];
                packet.trace_primary(&ctx, &mut batch, &mask, &mut out);

                let mut expected = [Color::ZERO; PACKET_SIZE];
                for lane in mask.lanes() {
                    let (dx, dy) = lane_offset(lane);
                    expected[lane] = scalar.trace_primary(&ctx, rays.ray(x + dx, y + dy));
                }
                assert_lanes_match(&out, &expected, &mask);
            }
        }
    }

    /// Counts batched queries without touching the per-lane defaults.
    struct BatchCounter {
        inner: BvhEngine,
        occluded_batches: AtomicUsize,
    }

    impl RayCastEngine for BatchCounter {
        fn intersect(&self, ray: &mut Ray) {
            self.inner.intersect(ray)
        }

        fn occluded(&self, ray: &Ray) -> bool {
            self.inner.occluded(ray)
        }

        fn occluded_batch(&self, batch: &RayBatch, mask: &LaneMask) -> [bool; PACKET_SIZE] {
            self.occluded_batches.fetch_add(1, Ordering::Relaxed);
            let mut occluded = [false; PACKET_SIZE];
            for lane in mask.lanes() {
                occluded[lane] = self.inner.occluded(&batch.ray(lane));
            }
            occluded
        }
    }

    #[test]
    fn test_one_shadow_batch_per_light_slot() {
        let mut scene = mirror_pair();
        scene.add_light(Vec3::new(0.0, 1.0, 0.0), Color::ONE, 50.0).unwrap();
        scene.add_light(Vec3::new(3.0, 1.0, 0.0), Color::ONE, 50.0).unwrap();
        let engine = BatchCounter {
            inner: BvhEngine::build(&scene),
            occluded_batches: AtomicUsize::new(0),
        };
        let ctx = SceneContext::new(&scene, &engine);
        let packet = PacketTracer::new(&TracerConfig {
            max_reflections: 0,
            ..Default::default()
        });

        let mut batch = RayBatch::default();
        for lane in 0..PACKET_SIZE {
            batch.set_ray(lane, &Ray::new(Vec3::new(lane as f32 * 0.3, 1.0, 0.1), Vec3::NEG_Y));
        }
        let mut out = [Color::ZERO; PACKET_SIZE];
        packet.trace_primary(&ctx, &mut batch, &LaneMask::ALL, &mut out);

        assert_eq!(engine.occluded_batches.load(Ordering::Relaxed), 2);
    }
}
