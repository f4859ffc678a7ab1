use re_math::Vec3;

use crate::Color;

/// Point light with linear falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub color: Color,
    /// Distance at which the light's contribution reaches zero. Must be > 0;
    /// `Scene::add_light` rejects anything else.
    pub range: f32,
}

impl Light {
    pub fn new(position: Vec3, color: Color, range: f32) -> Self {
        Self {
            position,
            color,
            range,
        }
    }

    /// Linear falloff `max(1 - distance / range, 0)`.
    #[inline]
    pub fn attenuation(&self, distance: f32) -> f32 {
        (1.0 - distance / self.range).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attenuation_is_linear() {
        let light = Light::new(Vec3::ZERO, Color::ONE, 10.0);

        assert_eq!(light.attenuation(0.0), 1.0);
        assert!((light.attenuation(2.5) - 0.75).abs() < 1e-6);
        assert_eq!(light.attenuation(10.0), 0.0);
        assert_eq!(light.attenuation(25.0), 0.0);
    }
}
