//! Fixed-function Phong material.

use std::sync::Arc;

use crate::{Color, Texture};

/// Surface description used by the shading pipeline.
///
/// Lit colour is `diffuse * image(uv) * (scene ambient + ambient + Σ lights)
/// + Σ specular`, with `shininess == 0` disabling the highlight.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    /// Phong exponent; zero means no highlight.
    pub shininess: f32,
    /// Diffuse image sampled at the hit's texture coordinate.
    pub image: Arc<Texture>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Color::ZERO,
            diffuse: Color::ONE,
            specular: Color::ZERO,
            shininess: 0.0,
            image: Arc::new(Texture::solid_color(Color::ONE)),
        }
    }
}

impl Material {
    /// Create an untextured material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse: Color) -> Self {
        Self {
            name: name.into(),
            diffuse,
            ..Default::default()
        }
    }

    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    /// Enable a Phong highlight.
    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_image(mut self, image: Arc<Texture>) -> Self {
        self.image = image;
        self
    }

    pub fn has_highlight(&self) -> bool {
        self.shininess > 0.0
    }
}
