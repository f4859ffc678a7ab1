use re_math::Vec3;

/// Pinhole camera: a position, an orthonormal frame and a vertical FOV.
///
/// `zaxis` looks into the scene, `yaxis` is up and `xaxis` is right on
/// screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub xaxis: Vec3,
    pub yaxis: Vec3,
    pub zaxis: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            xaxis: Vec3::X,
            yaxis: Vec3::Y,
            zaxis: Vec3::NEG_Z,
            fov: 60.0,
        }
    }
}

impl Camera {
    /// Camera at `position` looking towards `target` with world up +Y.
    pub fn look_at(position: Vec3, target: Vec3, fov: f32) -> Self {
        let zaxis = (target - position).normalize();
        let xaxis = -Vec3::Y.cross(zaxis).normalize();
        let yaxis = -zaxis.cross(xaxis);
        Self {
            position,
            xaxis,
            yaxis,
            zaxis,
            fov,
        }
    }

    /// `tan(fov / 2)`, the half-height of the image plane at distance 1.
    pub fn fov_scale(&self) -> f32 {
        (self.fov.to_radians() * 0.5).tan()
    }
}
