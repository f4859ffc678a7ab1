//! RayEngine Core - scene data consumed by the tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with per-primitive barycentric attribute lookup
//! - **Appearance**: `Material`, `Texture`, `Light`
//! - **Scene graph**: `Scene`, `Object`, `Transform`, `Camera`
//!
//! Scenes are validated once with [`Scene::validate`] before tracing so the
//! per-ray code can assume well-formed data.

pub mod camera;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;

/// Linear RGB color.
pub type Color = re_math::Vec3;

pub use camera::Camera;
pub use light::Light;
pub use material::Material;
pub use mesh::Mesh;
pub use scene::{Object, Scene, SceneError, SceneResult, SurfaceRef, Transform};
pub use texture::{Filter, Texture, TextureError, TextureResult};
