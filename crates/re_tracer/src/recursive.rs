//! Scalar Whitted tracer: one ray at a time, mirror reflections by
//! recursion.

use re_core::Color;

use crate::config::TracerConfig;
use crate::context::SceneContext;
use crate::ray::Ray;
use crate::shading::ShadingEvaluator;

#[derive(Debug, Clone)]
pub struct RecursiveTracer {
    shading: ShadingEvaluator,
    max_reflections: u32,
    reflection_coefficient: f32,
}

impl RecursiveTracer {
    pub fn new(config: &TracerConfig) -> Self {
        Self {
            shading: ShadingEvaluator::new(config),
            max_reflections: config.max_reflections,
            reflection_coefficient: config.reflection_coefficient,
        }
    }

    pub fn shading(&self) -> &ShadingEvaluator {
        &self.shading
    }

    pub fn max_reflections(&self) -> u32 {
        self.max_reflections
    }

    /// Intersect a camera ray and trace it from depth 0.
    pub fn trace_primary(&self, ctx: &SceneContext<'_>, mut ray: Ray) -> Color {
        ctx.engine.intersect(&mut ray);
        self.trace(ctx, &ray, 0)
    }

    /// Colour carried back along an already-intersected ray.
    ///
    /// Shading runs at most `max_reflections + 1` times per primary ray.
    pub fn trace(&self, ctx: &SceneContext<'_>, ray: &Ray, depth: u32) -> Color {
        if !ray.is_hit() {
            return self.shading.shade_miss(ctx, ray.direction, ray.transmittance);
        }

        let mut hit = self.shading.resolve_hit(ctx, ray);
        self.shading.accumulate_lights(ctx, &mut hit);
        let mut result = self.shading.shade(ctx, &hit) + ray.transmittance;

        if depth < self.max_reflections {
            let mut reflected = self.shading.reflection_ray(ray, &hit);
            ctx.engine.intersect(&mut reflected);
            result += self.reflection_coefficient * self.trace(ctx, &reflected, depth + 1);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BvhEngine;
    use crate::test_scenes::{mirror_pair, showcase, CountingEngine};
    use re_core::{Material, Mesh, Object, Scene, Texture, Transform};
    use re_math::Vec3;
    use std::sync::Arc;

    #[test]
    fn test_miss_is_sky_at_every_depth() {
        let scene = Scene::new("void").with_sky(Arc::new(Texture::solid_color(Color::new(0.1, 0.2, 0.3))));
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let tracer = RecursiveTracer::new(&TracerConfig::default());

        let mut ray = Ray::new(Vec3::ZERO, Vec3::new(0.4, 0.2, -1.0));
        ray.transmittance = Color::splat(0.5);

        for depth in [0, 1, 2, 7] {
            let color = tracer.trace(&ctx, &ray, depth);
            assert!(color.abs_diff_eq(Color::new(0.6, 0.7, 0.8), 1e-6), "depth {depth}: {color}");
        }
    }

    #[test]
    fn test_reflections_are_bounded() {
        let scene = mirror_pair();
        let engine = CountingEngine::new(BvhEngine::build(&scene));
        let ctx = SceneContext::new(&scene, &engine);

        for max_reflections in [0, 1, 3, 6] {
            let tracer = RecursiveTracer::new(&TracerConfig {
                max_reflections,
                ..Default::default()
            });
            let before = engine.intersects();

            let color = tracer.trace_primary(&ctx, Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.1, -1.0, 0.05)));

            // One intersect per shaded hit; every ray in the chain hits a mirror
            assert_eq!(engine.intersects() - before, max_reflections as usize + 1);
            assert!(color.is_finite());
        }
    }

    #[test]
    fn test_reflection_of_sky() {
        let mut scene = Scene::new("mirror floor").with_sky(Arc::new(Texture::solid_color(Color::splat(0.8))));
        let material = scene.add_material(Material::new("black", Color::ZERO));
        scene.add_object(Object::new("floor", Transform::default()).with_mesh(Mesh::plane(10.0).with_material(material)));
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let tracer = RecursiveTracer::new(&TracerConfig::default());

        let color = tracer.trace_primary(&ctx, Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.3, -1.0, 0.0)));

        // Black surface plus a quarter of the sky seen in the mirror direction
        assert!(color.abs_diff_eq(Color::splat(0.2), 1e-5), "{color}");
    }

    #[test]
    fn test_single_light_diffuse_end_to_end() {
        let mut scene = Scene::new("lit floor").with_ambient(Color::splat(0.05));
        let material = scene.add_material(
            Material::new("floor", Color::new(0.9, 0.5, 0.2))
                .with_ambient(Color::splat(0.1))
                .with_image(Arc::new(Texture::solid_color(Color::new(0.5, 1.0, 0.8)))),
        );
        scene.add_object(Object::new("floor", Transform::default()).with_mesh(Mesh::plane(10.0).with_material(material)));
        let light_color = Color::new(1.0, 0.8, 0.6);
        scene.add_light(Vec3::new(1.0, 3.0, 0.0), light_color, 10.0).unwrap();

        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let tracer = RecursiveTracer::new(&TracerConfig {
            max_reflections: 0,
            ..Default::default()
        });

        let color = tracer.trace_primary(&ctx, Ray::new(Vec3::new(0.0, 2.0, 0.2), Vec3::NEG_Y));

        let hit = Vec3::new(0.0, 0.0, 0.2);
        let to_light = Vec3::new(1.0, 3.0, 0.0) - hit;
        let attenuation = 1.0 - to_light.length() / 10.0;
        let n_dot_l = Vec3::Y.dot(to_light.normalize()).max(0.0);
        let expected = Color::new(0.9, 0.5, 0.2)
            * Color::new(0.5, 1.0, 0.8)
            * (Color::splat(0.05) + Color::splat(0.1) + n_dot_l * attenuation * light_color);

        assert!(color.abs_diff_eq(expected, 1e-5), "{color} != {expected}");
    }

    #[test]
    fn test_showcase_traces_finite_colors() {
        let scene = showcase();
        scene.validate().unwrap();
        let engine = BvhEngine::build(&scene);
        let ctx = SceneContext::new(&scene, &engine);
        let tracer = RecursiveTracer::new(&TracerConfig::default());

        let rays = crate::context::PrimaryRays::new(&scene.camera, 16, 12);
        for y in 0..12 {
            for x in 0..16 {
                let color = tracer.trace_primary(&ctx, rays.ray(x, y));
                assert!(color.is_finite() && color.min_element() >= 0.0, "pixel {x},{y}: {color}");
            }
        }
    }
}
