//! Local shading: hit resolution, light visibility and the fixed-function
//! Phong model.
//!
//! The scalar and packet tracers share every formula in this module, which
//! is what keeps their images identical.

use re_core::{Color, Light, Material};
use re_math::{reflect, Vec2, Vec3};

use crate::config::TracerConfig;
use crate::context::SceneContext;
use crate::ray::Ray;

/// World-space shading inputs for one hit, plus the running light sums.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord<'a> {
    pub position: Vec3,
    /// Unit shading normal
    pub normal: Vec3,
    pub tex_coord: Vec2,
    /// Unit vector from the hit back towards the ray origin
    pub view_dir: Vec3,
    pub material: &'a Material,
    pub diffuse: Color,
    pub specular: Color,
}

/// Unoccluded-light candidate for one hit.
#[derive(Debug, Clone, Copy)]
pub struct LightProbe {
    /// Unit direction towards the light
    pub direction: Vec3,
    pub attenuation: f32,
    /// Shadow ray from the hit to the light, bounded by the light distance
    pub shadow_ray: Ray,
}

#[derive(Debug, Clone)]
pub struct ShadingEvaluator {
    ray_epsilon: f32,
    max_lights: Option<usize>,
}

impl ShadingEvaluator {
    pub fn new(config: &TracerConfig) -> Self {
        Self {
            ray_epsilon: config.ray_epsilon,
            max_lights: config.max_lights_per_hit,
        }
    }

    pub fn ray_epsilon(&self) -> f32 {
        self.ray_epsilon
    }

    /// Turn an engine hit into shading inputs.
    ///
    /// # Panics
    ///
    /// If the hit ids do not resolve in the scene. Engines built from the
    /// same scene always report resolvable ids.
    pub fn resolve_hit<'a>(&self, ctx: &SceneContext<'a>, ray: &Ray) -> HitRecord<'a> {
        let Some(surface) = ctx.scene.resolve(ray.instance_id, ray.geometry_id) else {
            unreachable!(
                "hit on instance {} geometry {} is not in scene '{}'",
                ray.instance_id, ray.geometry_id, ctx.scene.name
            );
        };

        let local_normal = surface.mesh.normal_at(ray.primitive_id, ray.u, ray.v);
        let normal = (surface.object.normal_matrix() * local_normal).normalize_or_zero();

        HitRecord {
            position: ray.hit_position(),
            normal,
            tex_coord: surface.mesh.tex_coord_at(ray.primitive_id, ray.u, ray.v),
            view_dir: -ray.direction.normalize_or_zero(),
            material: surface.material,
            diffuse: Color::ZERO,
            specular: Color::ZERO,
        }
    }

    /// Lights a hit evaluates, in scene order.
    pub fn lights<'a>(&self, ctx: &SceneContext<'a>) -> &'a [Light] {
        match self.max_lights {
            Some(cap) => &ctx.lights[..cap.min(ctx.lights.len())],
            None => ctx.lights,
        }
    }

    /// Attenuation and shadow ray for `light`, or `None` when the hit is out
    /// of the light's range.
    pub fn light_probe(&self, hit: &HitRecord<'_>, light: &Light) -> Option<LightProbe> {
        let to_light = light.position - hit.position;
        let distance = to_light.length();
        let attenuation = light.attenuation(distance);
        if attenuation <= 0.0 {
            return None;
        }

        let direction = to_light.normalize_or_zero();
        Some(LightProbe {
            direction,
            attenuation,
            shadow_ray: Ray::new(hit.position, direction).with_range(self.ray_epsilon, distance),
        })
    }

    /// Add a visible light's diffuse and specular terms to `hit`.
    pub fn apply_light(&self, hit: &mut HitRecord<'_>, light: &Light, probe: &LightProbe) {
        let n_dot_l = hit.normal.dot(probe.direction).max(0.0);
        hit.diffuse += n_dot_l * probe.attenuation * light.color;

        if hit.material.has_highlight() {
            let r_dot_v = reflect(probe.direction, hit.normal).dot(hit.view_dir).max(0.0);
            hit.specular += r_dot_v.powf(hit.material.shininess) * probe.attenuation * hit.material.specular;
        }
    }

    /// Probe, shadow-test and apply one light.
    pub fn accumulate_light(&self, ctx: &SceneContext<'_>, hit: &mut HitRecord<'_>, light: &Light) {
        let Some(probe) = self.light_probe(hit, light) else {
            return;
        };
        if !ctx.engine.occluded(&probe.shadow_ray) {
            self.apply_light(hit, light, &probe);
        }
    }

    pub fn accumulate_lights(&self, ctx: &SceneContext<'_>, hit: &mut HitRecord<'_>) {
        for light in self.lights(ctx) {
            self.accumulate_light(ctx, hit, light);
        }
    }

    /// `diffuse * image(uv) * (ambient + material ambient + Σ diffuse) + Σ specular`
    pub fn shade(&self, ctx: &SceneContext<'_>, hit: &HitRecord<'_>) -> Color {
        let material = hit.material;
        let texel = material.image.sample(hit.tex_coord);
        material.diffuse * texel * (ctx.ambient + material.ambient + hit.diffuse) + hit.specular
    }

    /// Mirror ray leaving `hit`, starting just off the surface.
    pub fn reflection_ray(&self, ray: &Ray, hit: &HitRecord<'_>) -> Ray {
        let direction = reflect(-ray.direction, hit.normal);
        Ray::new(hit.position, direction).with_range(self.ray_epsilon, f32::INFINITY)
    }

    /// Colour of a ray that left the scene.
    pub fn shade_miss(&self, ctx: &SceneContext<'_>, direction: Vec3, transmittance: Color) -> Color {
        ctx.sky(direction) + transmittance
    }
}
