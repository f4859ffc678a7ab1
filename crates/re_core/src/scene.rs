//! Scene graph types.
//!
//! A scene is a flat list of objects (each a transform plus a set of
//! meshes), a material table, point lights, an ambient term, an
//! equirectangular sky image and the active camera. Ray-cast engines
//! number objects and meshes in list order, so `(instance_id, geometry_id)`
//! from a hit resolves straight back into this structure.

use std::sync::Arc;

use re_math::{Aabb, Mat3, Mat4, Quat, Vec3};
use thiserror::Error;

use crate::{Camera, Color, Light, Material, Mesh, Texture};

/// Configuration errors caught before the first frame is traced.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("light {index} has invalid range {range} (must be finite and > 0)")]
    InvalidLightRange { index: usize, range: f32 },

    #[error("object {object} mesh {mesh} references unknown material {material_id}")]
    UnknownMaterial {
        object: usize,
        mesh: usize,
        material_id: usize,
    },

    #[error("material '{0}' has an empty diffuse image")]
    EmptyMaterialImage(String),

    #[error("sky image is empty")]
    EmptySky,

    #[error("object {object} mesh {mesh}: {attribute} count {found} does not match vertex count {expected}")]
    AttributeMismatch {
        object: usize,
        mesh: usize,
        attribute: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("object {object} mesh {mesh} has an index out of range or a partial triangle")]
    BadIndices { object: usize, mesh: usize },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Transform components that can be composed into a matrix.
#[derive(Clone, Debug)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A placed group of meshes. Its index in `Scene::objects` is the
/// instance id reported by ray-cast engines.
#[derive(Clone, Debug)]
pub struct Object {
    pub name: String,
    /// Meshes in geometry-id order
    pub meshes: Vec<Arc<Mesh>>,
    /// Transparent objects let rays through and tint their transmittance.
    pub transparent: bool,
    transform: Transform,
    matrix: Mat4,
    normal_matrix: Mat3,
}

impl Object {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        let matrix = transform.to_matrix();
        Self {
            name: name.into(),
            meshes: Vec::new(),
            transparent: false,
            transform,
            matrix,
            normal_matrix: normal_matrix(matrix),
        }
    }

    /// Add a mesh and return its geometry id within this object.
    pub fn add_mesh(&mut self, mut mesh: Mesh) -> usize {
        mesh.ensure_normals();
        self.meshes.push(Arc::new(mesh));
        self.meshes.len() - 1
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.add_mesh(mesh);
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.matrix = transform.to_matrix();
        self.normal_matrix = normal_matrix(self.matrix);
        self.transform = transform;
    }

    /// Object-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Inverse transpose of the object-to-world matrix, for normals.
    pub fn normal_matrix(&self) -> Mat3 {
        self.normal_matrix
    }
}

fn normal_matrix(matrix: Mat4) -> Mat3 {
    Mat3::from_mat4(matrix).inverse().transpose()
}

/// Everything needed to shade a hit on one mesh.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceRef<'a> {
    pub object: &'a Object,
    pub mesh: &'a Mesh,
    pub material: &'a Material,
}

/// A complete scene.
#[derive(Clone, Debug)]
pub struct Scene {
    pub name: String,
    pub camera: Camera,
    pub objects: Vec<Object>,
    pub materials: Vec<Arc<Material>>,
    lights: Vec<Light>,
    pub ambient: Color,
    /// Equirectangular sky sampled for rays that miss all geometry.
    pub sky: Arc<Texture>,
}

impl Scene {
    /// Create an empty scene with a black sky and no ambient light.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            camera: Camera::default(),
            objects: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            ambient: Color::ZERO,
            sky: Arc::new(Texture::solid_color(Color::ZERO)),
        }
    }

    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_sky(mut self, sky: Arc<Texture>) -> Self {
        self.sky = sky;
        self
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(Arc::new(material));
        self.materials.len() - 1
    }

    /// Add an object and return its instance id.
    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Add a point light. Non-positive or non-finite ranges are rejected.
    pub fn add_light(&mut self, position: Vec3, color: Color, range: f32) -> SceneResult<()> {
        if !(range.is_finite() && range > 0.0) {
            return Err(SceneError::InvalidLightRange {
                index: self.lights.len(),
                range,
            });
        }
        self.lights.push(Light::new(position, color, range));
        Ok(())
    }

    /// Lights in insertion order.
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Look up the mesh and material behind an engine hit.
    pub fn resolve(&self, instance_id: u32, geometry_id: u32) -> Option<SurfaceRef<'_>> {
        let object = self.objects.get(instance_id as usize)?;
        let mesh = object.meshes.get(geometry_id as usize)?;
        let material = self.materials.get(mesh.material_id)?;
        Some(SurfaceRef {
            object,
            mesh,
            material,
        })
    }

    /// Check every invariant the tracer relies on without re-checking per ray.
    pub fn validate(&self) -> SceneResult<()> {
        for (index, light) in self.lights.iter().enumerate() {
            if !(light.range.is_finite() && light.range > 0.0) {
                return Err(SceneError::InvalidLightRange {
                    index,
                    range: light.range,
                });
            }
        }

        for material in &self.materials {
            if material.image.is_empty() {
                return Err(SceneError::EmptyMaterialImage(material.name.clone()));
            }
        }

        if self.sky.is_empty() {
            return Err(SceneError::EmptySky);
        }

        for (object_index, object) in self.objects.iter().enumerate() {
            for (mesh_index, mesh) in object.meshes.iter().enumerate() {
                validate_mesh(object_index, mesh_index, mesh, self.materials.len())?;
            }
        }

        Ok(())
    }

    /// Get total triangle count across all objects.
    pub fn total_triangle_count(&self) -> usize {
        self.objects
            .iter()
            .flat_map(|o| o.meshes.iter())
            .map(|m| m.triangle_count())
            .sum()
    }

    /// Compute the world-space bounding box of all objects.
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for object in &self.objects {
            let matrix = object.matrix();
            for mesh in &object.meshes {
                for p in &mesh.positions {
                    let world = matrix.transform_point3(*p);
                    bounds = Aabb::surrounding(&bounds, &Aabb::from_points(world, world));
                }
            }
        }
        bounds
    }
}

fn validate_mesh(object: usize, mesh_index: usize, mesh: &Mesh, material_count: usize) -> SceneResult<()> {
    if mesh.material_id >= material_count {
        return Err(SceneError::UnknownMaterial {
            object,
            mesh: mesh_index,
            material_id: mesh.material_id,
        });
    }

    let expected = mesh.vertex_count();
    if let Some(normals) = &mesh.normals {
        if normals.len() != expected {
            return Err(SceneError::AttributeMismatch {
                object,
                mesh: mesh_index,
                attribute: "normal",
                found: normals.len(),
                expected,
            });
        }
    }
    if let Some(uvs) = &mesh.uvs {
        if uvs.len() != expected {
            return Err(SceneError::AttributeMismatch {
                object,
                mesh: mesh_index,
                attribute: "uv",
                found: uvs.len(),
                expected,
            });
        }
    }

    if mesh.indices.len() % 3 != 0 || mesh.indices.iter().any(|&i| i as usize >= expected) {
        return Err(SceneError::BadIndices {
            object,
            mesh: mesh_index,
        });
    }

    Ok(())
}
