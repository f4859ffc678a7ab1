//! Bounding Volume Hierarchy (BVH) ray-cast engine.
//!
//! Flattens every object's meshes into world-space triangles and builds a
//! median-split binary tree over them. Hits are reported with the ids the
//! scene uses to resolve them: instance = object index, geometry = mesh
//! index within the object, primitive = triangle index within the mesh.

use std::time::Instant;

use re_core::{Color, Scene};
use re_math::{Aabb, Interval, Vec3};

use crate::engine::RayCastEngine;
use crate::ray::Ray;

/// Maximum triangles per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// Transmittance added for every transparent surface a ray passes through.
const TRANSPARENT_TINT: f32 = 0.5;

/// A world-space triangle plus the ids that identify it in the scene.
#[derive(Debug, Clone)]
struct WorldTriangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    bbox: Aabb,
    instance_id: u32,
    geometry_id: u32,
    primitive_id: u32,
    transparent: bool,
}

impl WorldTriangle {
    fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0,
            edge1: v1 - v0,
            edge2: v2 - v0,
            bbox: Aabb::from_triangle(v0, v1, v2),
            instance_id: 0,
            geometry_id: 0,
            primitive_id: 0,
            transparent: false,
        }
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns `(t, u, v)` with `p = (1-u-v)·v0 + u·v1 + v·v2`.
    fn intersect(&self, origin: Vec3, direction: Vec3, ray_t: Interval) -> Option<(f32, f32, f32)> {
        let h = direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        ray_t.contains(t).then_some((t, u, v))
    }
}

/// BVH node - either a branch with two children or a leaf with triangles.
enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf holding indices into the engine's triangle list.
    Leaf { triangles: Vec<usize>, bbox: Aabb },
    Empty,
}

impl BvhNode {
    /// Simple median-split approach: sort triangles by centroid on the
    /// longest centroid axis, split in half, recurse.
    fn build(triangles: &[WorldTriangle], mut indices: Vec<usize>) -> Self {
        if indices.is_empty() {
            return BvhNode::Empty;
        }

        let bbox = indices
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &triangles[i].bbox));

        if indices.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles: indices,
                bbox,
            };
        }

        let centroid_bounds = indices.iter().fold(Aabb::EMPTY, |acc, &i| {
            let c = triangles[i].bbox.centroid();
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        indices.sort_unstable_by(|&a, &b| {
            let a_val = triangles[a].bbox.centroid()[axis];
            let b_val = triangles[b].bbox.centroid()[axis];
            a_val.partial_cmp(&b_val).unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_indices = indices.split_off(indices.len() / 2);

        BvhNode::Branch {
            left: Box::new(Self::build(triangles, indices)),
            right: Box::new(Self::build(triangles, right_indices)),
            bbox,
        }
    }

    fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
            _ => 1,
        }
    }
}

/// Traversal state for a closest-hit query.
struct ClosestHit {
    t: f32,
    triangle: Option<(usize, f32, f32)>,
    /// Distances of transparent surfaces seen so far
    transparent_hits: Vec<f32>,
}

/// Reference [`RayCastEngine`] over a static scene.
pub struct BvhEngine {
    triangles: Vec<WorldTriangle>,
    root: BvhNode,
}

impl BvhEngine {
    /// Build the hierarchy over every triangle in `scene`.
    ///
    /// The engine snapshots world-space geometry; rebuild it after moving
    /// objects.
    pub fn build(scene: &Scene) -> Self {
        let start = Instant::now();
        let mut triangles = Vec::with_capacity(scene.total_triangle_count());

        for (instance_id, object) in scene.objects.iter().enumerate() {
            let matrix = object.matrix();
            for (geometry_id, mesh) in object.meshes.iter().enumerate() {
                for primitive_id in 0..mesh.triangle_count() {
                    let [p0, p1, p2] = mesh.triangle(primitive_id as u32);
                    let mut triangle = WorldTriangle::new(
                        matrix.transform_point3(p0),
                        matrix.transform_point3(p1),
                        matrix.transform_point3(p2),
                    );
                    triangle.instance_id = instance_id as u32;
                    triangle.geometry_id = geometry_id as u32;
                    triangle.primitive_id = primitive_id as u32;
                    triangle.transparent = object.transparent;
                    triangles.push(triangle);
                }
            }
        }

        let root = BvhNode::build(&triangles, (0..triangles.len()).collect());

        log::info!(
            "Built BVH for '{}': {} triangles, depth {}, in {:.2?}",
            scene.name,
            triangles.len(),
            root.depth(),
            start.elapsed()
        );

        Self { triangles, root }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.root.bbox()
    }

    fn closest_hit(&self, node: &BvhNode, origin: Vec3, direction: Vec3, inv_dir: Vec3, tnear: f32, hit: &mut ClosestHit) {
        match node {
            BvhNode::Empty => {}

            BvhNode::Leaf { triangles, bbox } => {
                if !bbox.hit(origin, inv_dir, Interval::new(tnear, hit.t)) {
                    return;
                }
                for &index in triangles {
                    let triangle = &self.triangles[index];
                    let Some((t, u, v)) = triangle.intersect(origin, direction, Interval::new(tnear, hit.t)) else {
                        continue;
                    };
                    if triangle.transparent {
                        hit.transparent_hits.push(t);
                    } else {
                        hit.t = t;
                        hit.triangle = Some((index, u, v));
                    }
                }
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(origin, inv_dir, Interval::new(tnear, hit.t)) {
                    return;
                }
                // Right is only searched up to whatever left found
                self.closest_hit(left, origin, direction, inv_dir, tnear, hit);
                self.closest_hit(right, origin, direction, inv_dir, tnear, hit);
            }
        }
    }

    fn any_opaque_hit(&self, node: &BvhNode, origin: Vec3, direction: Vec3, inv_dir: Vec3, ray_t: Interval) -> bool {
        match node {
            BvhNode::Empty => false,

            BvhNode::Leaf { triangles, bbox } => {
                bbox.hit(origin, inv_dir, ray_t)
                    && triangles.iter().any(|&index| {
                        let triangle = &self.triangles[index];
                        !triangle.transparent && triangle.intersect(origin, direction, ray_t).is_some()
                    })
            }

            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(origin, inv_dir, ray_t)
                    && (self.any_opaque_hit(left, origin, direction, inv_dir, ray_t)
                        || self.any_opaque_hit(right, origin, direction, inv_dir, ray_t))
            }
        }
    }
}

impl RayCastEngine for BvhEngine {
    fn intersect(&self, ray: &mut Ray) {
        let mut hit = ClosestHit {
            t: ray.tfar,
            triangle: None,
            transparent_hits: Vec::new(),
        };
        let inv_dir = ray.direction.recip();
        self.closest_hit(&self.root, ray.origin, ray.direction, inv_dir, ray.tnear, &mut hit);

        // Transparent surfaces behind the closest opaque hit were never crossed
        let crossed = hit.transparent_hits.iter().filter(|&&t| t <= hit.t).count();
        ray.transmittance += Color::splat(TRANSPARENT_TINT * crossed as f32);

        if let Some((index, u, v)) = hit.triangle {
            let triangle = &self.triangles[index];
            ray.tfar = hit.t;
            ray.instance_id = triangle.instance_id;
            ray.geometry_id = triangle.geometry_id;
            ray.primitive_id = triangle.primitive_id;
            ray.u = u;
            ray.v = v;
        }
    }

    fn occluded(&self, ray: &Ray) -> bool {
        let inv_dir = ray.direction.recip();
        self.any_opaque_hit(
            &self.root,
            ray.origin,
            ray.direction,
            inv_dir,
            Interval::new(ray.tnear, ray.tfar),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use re_core::{Material, Mesh, Object, Transform};
    use re_math::Quat;

    fn floor_scene() -> Scene {
        let mut scene = Scene::new("floor");
        scene.add_material(Material::default());
        scene.add_object(Object::new("floor", Transform::default()).with_mesh(Mesh::plane(10.0)));
        scene
    }

    fn down_ray(x: f32, z: f32) -> Ray {
        Ray::new(Vec3::new(x, 5.0, z), Vec3::NEG_Y)
    }

    #[test]
    fn test_empty_scene_never_hits() {
        let engine = BvhEngine::build(&Scene::new("empty"));
        let mut ray = down_ray(0.0, 0.0);

        engine.intersect(&mut ray);

        assert_eq!(engine.triangle_count(), 0);
        assert!(!ray.is_hit());
        assert_eq!(ray.tfar, f32::INFINITY);
        assert!(!engine.occluded(&ray));
    }

    #[test]
    fn test_barycentrics_reconstruct_hit() {
        let scene = floor_scene();
        let engine = BvhEngine::build(&scene);
        let mut ray = down_ray(1.3, -2.7);

        engine.intersect(&mut ray);

        assert!(ray.is_hit());
        assert!((ray.tfar - 5.0).abs() < 1e-5);

        let mesh = &scene.objects[0].meshes[0];
        let [v0, v1, v2] = mesh.triangle(ray.primitive_id);
        let p = v0 * (1.0 - ray.u - ray.v) + v1 * ray.u + v2 * ray.v;
        assert!(p.abs_diff_eq(ray.hit_position(), 1e-4));
    }

    #[test]
    fn test_hit_ids_follow_scene_order() {
        let mut scene = floor_scene();
        let mut object = Object::new("pair", Transform::from_translation(Vec3::new(20.0, 0.0, 0.0)));
        object.add_mesh(Mesh::plane(1.0));
        object.add_mesh(Mesh::cube(0.5));
        scene.add_object(object);
        let engine = BvhEngine::build(&scene);

        let mut ray = down_ray(20.0, 0.1);
        engine.intersect(&mut ray);

        assert_eq!(ray.instance_id, 1);
        assert_eq!(ray.geometry_id, 1); // the cube top sits above the plane
        assert!((ray.tfar - 4.5).abs() < 1e-5);
        assert!(scene.resolve(ray.instance_id, ray.geometry_id).is_some());
    }

    #[test]
    fn test_respects_ray_range() {
        let engine = BvhEngine::build(&floor_scene());

        let mut short = down_ray(0.0, 0.0).with_range(0.0, 4.0);
        engine.intersect(&mut short);
        assert!(!short.is_hit());
        assert!(!engine.occluded(&short));

        let past = down_ray(0.0, 0.0).with_range(6.0, f32::INFINITY);
        assert!(!engine.occluded(&past));

        assert!(engine.occluded(&down_ray(0.0, 0.0).with_range(0.0, 5.5)));
    }

    #[test]
    fn test_transformed_object() {
        let mut scene = Scene::new("tilted");
        scene.add_material(Material::default());
        scene.add_object(
            Object::new(
                "wall",
                Transform::from_translation(Vec3::new(0.0, 0.0, -3.0))
                    .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)),
            )
            .with_mesh(Mesh::plane(1.0)),
        );
        let engine = BvhEngine::build(&scene);

        let mut ray = Ray::new(Vec3::new(0.2, 0.1, 0.0), Vec3::NEG_Z);
        engine.intersect(&mut ray);

        assert!(ray.is_hit());
        assert!((ray.tfar - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_transparent_surfaces_tint_but_never_stop() {
        let mut scene = floor_scene();
        scene.add_object(
            Object::new("glass", Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)))
                .with_mesh(Mesh::cube(0.5))
                .transparent(),
        );
        let engine = BvhEngine::build(&scene);

        // Off the face diagonals so each face is crossed exactly once
        let mut ray = down_ray(0.3, 0.2);
        engine.intersect(&mut ray);

        assert_eq!(ray.instance_id, 0);
        assert!((ray.tfar - 5.0).abs() < 1e-5);
        assert!(ray.transmittance.abs_diff_eq(Color::splat(1.0), 1e-6));

        // Shadow probes pass straight through
        assert!(!engine.occluded(&down_ray(0.3, 0.2).with_range(0.0, 4.0)));
    }

    #[test]
    fn test_transparent_behind_opaque_not_counted() {
        let mut scene = floor_scene();
        scene.add_object(
            Object::new("under", Transform::from_translation(Vec3::new(0.0, -2.0, 0.0)))
                .with_mesh(Mesh::cube(0.5))
                .transparent(),
        );
        let engine = BvhEngine::build(&scene);

        let mut ray = down_ray(0.3, 0.2);
        engine.intersect(&mut ray);

        assert_eq!(ray.instance_id, 0);
        assert_eq!(ray.transmittance, Color::ZERO);
    }

    #[test]
    fn test_many_triangles_split_into_tree() {
        let mut scene = Scene::new("grid");
        scene.add_material(Material::default());
        for i in 0..10 {
            scene.add_object(
                Object::new(format!("cube{i}"), Transform::from_translation(Vec3::new(i as f32 * 3.0, 0.0, 0.0)))
                    .with_mesh(Mesh::cube(0.5)),
            );
        }
        let engine = BvhEngine::build(&scene);
        assert_eq!(engine.triangle_count(), 120);
        assert!(engine.root.depth() > 1);

        // Ray that hits the cube at x = 15
        let mut ray = Ray::new(Vec3::new(15.1, 5.0, 0.2), Vec3::NEG_Y);
        engine.intersect(&mut ray);
        assert_eq!(ray.instance_id, 5);
        assert!((ray.hit_position().y - 0.5).abs() < 1e-4);
    }
}
