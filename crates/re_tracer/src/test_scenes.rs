//! Scenes and engine wrappers shared by the tracer tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use re_core::{Camera, Color, Material, Mesh, Object, Scene, Texture, Transform};
use re_math::{Quat, Vec3};

use crate::engine::RayCastEngine;
use crate::ray::Ray;

/// Sky with a horizontal gradient so misses in different directions differ.
pub fn gradient_sky() -> Arc<Texture> {
    let pixels = (0..8)
        .flat_map(|y| (0..16).map(move |x| [x as f32 / 15.0, y as f32 / 7.0, 0.5, 1.0]))
        .collect();
    Arc::new(Texture::new(16, 8, pixels, "<gradient>"))
}

/// Checker image so texture lookups vary across a surface.
pub fn checker() -> Arc<Texture> {
    let pixels = (0..4)
        .flat_map(|y| (0..4).map(move |x| if (x + y) % 2 == 0 { [1.0; 4] } else { [0.2, 0.2, 0.2, 1.0] }))
        .collect();
    Arc::new(Texture::new(4, 4, pixels, "<checker>"))
}

/// Floor, a few cubes (one transparent, one shiny), and three lights.
pub fn showcase() -> Scene {
    let mut scene = Scene::new("showcase")
        .with_ambient(Color::splat(0.05))
        .with_sky(gradient_sky());
    scene.camera = Camera::look_at(Vec3::new(0.0, 3.0, 8.0), Vec3::new(0.0, 0.5, 0.0), 50.0);

    let floor = scene.add_material(
        Material::new("floor", Color::new(0.9, 0.9, 0.8))
            .with_ambient(Color::splat(0.02))
            .with_image(checker()),
    );
    let red = scene.add_material(Material::new("red", Color::new(0.8, 0.1, 0.1)).with_specular(Color::splat(0.6), 32.0));
    let blue = scene.add_material(Material::new("blue", Color::new(0.1, 0.2, 0.9)));

    scene.add_object(Object::new("floor", Transform::default()).with_mesh(Mesh::plane(6.0).with_material(floor)));
    scene.add_object(
        Object::new(
            "red cube",
            Transform::from_translation(Vec3::new(-1.2, 0.6, 0.0)).with_rotation(Quat::from_rotation_y(0.5)),
        )
        .with_mesh(Mesh::cube(0.6).with_material(red)),
    );
    scene.add_object(
        Object::new(
            "blue slab",
            Transform::from_translation(Vec3::new(1.5, 0.4, -0.5)).with_scale(Vec3::new(1.5, 0.4, 0.8)),
        )
        .with_mesh(Mesh::cube(1.0).with_material(blue)),
    );
    scene.add_object(
        Object::new("glass", Transform::from_translation(Vec3::new(0.3, 1.8, 1.0)))
            .with_mesh(Mesh::cube(0.4).with_material(blue))
            .transparent(),
    );

    for (position, color, range) in [
        (Vec3::new(2.0, 4.0, 3.0), Color::new(1.0, 0.9, 0.8), 12.0),
        (Vec3::new(-3.0, 2.5, 1.0), Color::new(0.3, 0.4, 1.0), 7.0),
        (Vec3::new(0.0, 1.2, -2.5), Color::new(0.8, 0.8, 0.2), 4.0),
    ] {
        scene
            .add_light(position, color, range)
            .unwrap_or_else(|e| panic!("fixture light rejected: {e}"));
    }

    scene
}

/// Two facing mirrors at y = 0 and y = 2 so reflections never escape.
pub fn mirror_pair() -> Scene {
    let mut scene = Scene::new("mirrors");
    let material = scene.add_material(Material::new("mirror", Color::splat(0.5)));
    scene.add_object(Object::new("bottom", Transform::default()).with_mesh(Mesh::plane(100.0).with_material(material)));
    scene.add_object(
        Object::new(
            "top",
            Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)).with_rotation(Quat::from_rotation_x(std::f32::consts::PI)),
        )
        .with_mesh(Mesh::plane(100.0).with_material(material)),
    );
    scene
}

/// Forwards to an inner engine and counts the scalar queries it sees.
pub struct CountingEngine<E> {
    pub inner: E,
    pub intersects: AtomicUsize,
    pub occlusions: AtomicUsize,
}

impl<E> CountingEngine<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            intersects: AtomicUsize::new(0),
            occlusions: AtomicUsize::new(0),
        }
    }

    pub fn intersects(&self) -> usize {
        self.intersects.load(Ordering::Relaxed)
    }
}

impl<E: RayCastEngine> RayCastEngine for CountingEngine<E> {
    fn intersect(&self, ray: &mut Ray) {
        self.intersects.fetch_add(1, Ordering::Relaxed);
        self.inner.intersect(ray)
    }

    fn occluded(&self, ray: &Ray) -> bool {
        self.occlusions.fetch_add(1, Ordering::Relaxed);
        self.inner.occluded(ray)
    }
}
