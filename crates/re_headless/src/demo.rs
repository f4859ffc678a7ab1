//! Built-in demo scene: a checkered floor, a mirror wall, a ring of cubes
//! and a handful of coloured point lights.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use re_core::{Camera, Color, Material, Mesh, Object, Scene, SceneResult, Texture, Transform};
use re_math::{Quat, Vec3};

/// Checker image with `cells` squares per side, linear colours.
fn checker(cells: u32, a: Color, b: Color) -> Texture {
    let size = cells * 8;
    let pixels = (0..size)
        .flat_map(move |y| {
            (0..size).map(move |x| {
                let c = if (x / 8 + y / 8) % 2 == 0 { a } else { b };
                [c.x, c.y, c.z, 1.0]
            })
        })
        .collect();
    Texture::new(size, size, pixels, "<checker>")
}

/// Equirectangular sky: horizon haze blending to a deep blue zenith.
fn sky() -> Texture {
    let (width, height) = (64, 32);
    let zenith = Color::new(0.15, 0.3, 0.7);
    let horizon = Color::new(0.8, 0.85, 0.9);
    let ground = Color::new(0.2, 0.18, 0.15);

    let pixels = (0..height)
        .flat_map(|y| {
            // Row 0 is the top of the image, i.e. straight up
            let v = 1.0 - (y as f32 + 0.5) / height as f32;
            let c = if v >= 0.5 {
                horizon.lerp(zenith, (v - 0.5) * 2.0)
            } else {
                ground.lerp(horizon, v * 2.0)
            };
            (0..width).map(move |_| [c.x, c.y, c.z, 1.0])
        })
        .collect();
    Texture::new(width, height, pixels, "<sky>")
}

/// Build the demo scene. `seed` controls cube placement and colours.
pub fn build(seed: u64) -> SceneResult<Scene> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = Scene::new("demo")
        .with_ambient(Color::splat(0.04))
        .with_sky(Arc::new(sky()));
    scene.camera = Camera::look_at(Vec3::new(0.0, 4.0, 11.0), Vec3::new(0.0, 0.8, 0.0), 55.0);

    let floor = scene.add_material(
        Material::new("floor", Color::splat(0.9))
            .with_ambient(Color::splat(0.02))
            .with_image(Arc::new(checker(8, Color::splat(0.9), Color::splat(0.25)))),
    );
    let mirror = scene.add_material(Material::new("mirror", Color::splat(0.15)).with_specular(Color::ONE, 64.0));

    scene.add_object(Object::new("floor", Transform::default()).with_mesh(Mesh::plane(12.0).with_material(floor)));
    scene.add_object(
        Object::new(
            "mirror wall",
            Transform::from_translation(Vec3::new(0.0, 3.0, -6.0))
                .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::new(1.0, 1.0, 0.5)),
        )
        .with_mesh(Mesh::plane(6.0).with_material(mirror)),
    );

    let cubes = 8;
    for i in 0..cubes {
        let angle = i as f32 / cubes as f32 * std::f32::consts::TAU;
        let size = rng.gen_range(0.35..0.8);
        let position = Vec3::new(angle.cos() * 3.5, size, angle.sin() * 3.5);
        let color = Color::new(rng.gen_range(0.1..1.0), rng.gen_range(0.1..1.0), rng.gen_range(0.1..1.0));

        let mut material = Material::new(format!("cube{i}"), color);
        if rng.gen_bool(0.5) {
            material = material.with_specular(Color::splat(0.5), rng.gen_range(8.0..64.0));
        }
        let material = scene.add_material(material);

        let mut object = Object::new(
            format!("cube{i}"),
            Transform::from_translation(position).with_rotation(Quat::from_rotation_y(rng.gen_range(0.0..1.5))),
        )
        .with_mesh(Mesh::cube(size).with_material(material));
        // One see-through cube
        if i == 0 {
            object = object.transparent();
        }
        scene.add_object(object);
    }

    scene.add_light(Vec3::new(4.0, 6.0, 4.0), Color::new(1.0, 0.95, 0.85), 16.0)?;
    scene.add_light(Vec3::new(-5.0, 3.0, 1.0), Color::new(0.3, 0.4, 1.0), 10.0)?;
    scene.add_light(Vec3::new(0.0, 1.5, 0.0), Color::new(1.0, 0.5, 0.2), 5.0)?;

    scene.validate()?;
    Ok(scene)
}
