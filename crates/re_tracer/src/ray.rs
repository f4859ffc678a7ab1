//! Rays and ray packets.
//!
//! The layout mirrors what a ray-cast engine reads and writes back: query
//! fields (origin, direction, range, time) followed by hit fields that the
//! engine fills in. `geometry_id == INVALID_ID` is the one and only miss
//! marker.

use re_core::Color;
use re_math::Vec3;

/// Id written to the hit fields of a ray that hit nothing.
pub const INVALID_ID: u32 = u32::MAX;

/// Lanes per packet.
pub const PACKET_SIZE: usize = 8;

/// A ray plus the hit record a ray-cast engine writes back into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction (not necessarily normalized)
    pub direction: Vec3,
    pub tnear: f32,
    /// Upper bound of the query; the hit distance after a successful intersect.
    pub tfar: f32,
    pub time: f32,

    pub instance_id: u32,
    pub geometry_id: u32,
    pub primitive_id: u32,
    /// Barycentric coordinates of the hit on the primitive
    pub u: f32,
    pub v: f32,
    /// Light accumulated while passing through transparent surfaces
    pub transmittance: Color,
}

impl Ray {
    /// Unbounded ray starting at `origin`, no hit recorded.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            tnear: 0.0,
            tfar: f32::INFINITY,
            time: 0.0,
            instance_id: INVALID_ID,
            geometry_id: INVALID_ID,
            primitive_id: INVALID_ID,
            u: 0.0,
            v: 0.0,
            transmittance: Color::ZERO,
        }
    }

    /// Restrict the query to `[tnear, tfar]`.
    #[inline]
    pub fn with_range(mut self, tnear: f32, tfar: f32) -> Self {
        self.tnear = tnear;
        self.tfar = tfar;
        self
    }

    /// True once an engine has recorded a hit.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.geometry_id != INVALID_ID
    }

    /// P(t) = origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// World position of the recorded hit.
    #[inline]
    pub fn hit_position(&self) -> Vec3 {
        self.at(self.tfar)
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}

/// Per-lane validity of a packet.
///
/// All packet code walks lanes through [`LaneMask::lanes`], so invalid
/// lanes are skipped by construction rather than by ad-hoc checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneMask([bool; PACKET_SIZE]);

impl LaneMask {
    pub const NONE: LaneMask = LaneMask([false; PACKET_SIZE]);
    pub const ALL: LaneMask = LaneMask([true; PACKET_SIZE]);

    pub fn from_fn(f: impl FnMut(usize) -> bool) -> Self {
        Self(std::array::from_fn(f))
    }

    #[inline]
    pub fn set(&mut self, lane: usize, valid: bool) {
        self.0[lane] = valid;
    }

    #[inline]
    pub fn is_set(&self, lane: usize) -> bool {
        self.0[lane]
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|&v| v)
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&v| v).count()
    }

    /// Indices of the valid lanes, ascending.
    pub fn lanes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..PACKET_SIZE).filter(move |&lane| self.0[lane])
    }
}

/// Struct-of-arrays packet of [`PACKET_SIZE`] rays.
///
/// The batch carries no validity of its own; every operation takes a
/// [`LaneMask`] and leaves lanes outside it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RayBatch {
    pub org_x: [f32; PACKET_SIZE],
    pub org_y: [f32; PACKET_SIZE],
    pub org_z: [f32; PACKET_SIZE],
    pub dir_x: [f32; PACKET_SIZE],
    pub dir_y: [f32; PACKET_SIZE],
    pub dir_z: [f32; PACKET_SIZE],
    pub tnear: [f32; PACKET_SIZE],
    pub tfar: [f32; PACKET_SIZE],
    pub time: [f32; PACKET_SIZE],

    pub instance_id: [u32; PACKET_SIZE],
    pub geometry_id: [u32; PACKET_SIZE],
    pub primitive_id: [u32; PACKET_SIZE],
    pub u: [f32; PACKET_SIZE],
    pub v: [f32; PACKET_SIZE],
    pub transmittance: [Color; PACKET_SIZE],
}

impl Default for RayBatch {
    fn default() -> Self {
        Self {
            org_x: [0.0; PACKET_SIZE],
            org_y: [0.0; PACKET_SIZE],
            org_z: [0.0; PACKET_SIZE],
            dir_x: [0.0; PACKET_SIZE],
            dir_y: [0.0; PACKET_SIZE],
            dir_z: [1.0; PACKET_SIZE],
            tnear: [0.0; PACKET_SIZE],
            tfar: [f32::INFINITY; PACKET_SIZE],
            time: [0.0; PACKET_SIZE],
            instance_id: [INVALID_ID; PACKET_SIZE],
            geometry_id: [INVALID_ID; PACKET_SIZE],
            primitive_id: [INVALID_ID; PACKET_SIZE],
            u: [0.0; PACKET_SIZE],
            v: [0.0; PACKET_SIZE],
            transmittance: [Color::ZERO; PACKET_SIZE],
        }
    }
}

impl RayBatch {
    /// Gather lane `lane` into a scalar ray.
    pub fn ray(&self, lane: usize) -> Ray {
        Ray {
            origin: Vec3::new(self.org_x[lane], self.org_y[lane], self.org_z[lane]),
            direction: Vec3::new(self.dir_x[lane], self.dir_y[lane], self.dir_z[lane]),
            tnear: self.tnear[lane],
            tfar: self.tfar[lane],
            time: self.time[lane],
            instance_id: self.instance_id[lane],
            geometry_id: self.geometry_id[lane],
            primitive_id: self.primitive_id[lane],
            u: self.u[lane],
            v: self.v[lane],
            transmittance: self.transmittance[lane],
        }
    }

    /// Scatter a scalar ray into lane `lane`, query and hit fields alike.
    pub fn set_ray(&mut self, lane: usize, ray: &Ray) {
        self.org_x[lane] = ray.origin.x;
        self.org_y[lane] = ray.origin.y;
        self.org_z[lane] = ray.origin.z;
        self.dir_x[lane] = ray.direction.x;
        self.dir_y[lane] = ray.direction.y;
        self.dir_z[lane] = ray.direction.z;
        self.tnear[lane] = ray.tnear;
        self.time[lane] = ray.time;
        self.store_hit(lane, ray);
    }

    /// Write back only what an intersect query produces.
    pub fn store_hit(&mut self, lane: usize, ray: &Ray) {
        self.tfar[lane] = ray.tfar;
        self.instance_id[lane] = ray.instance_id;
        self.geometry_id[lane] = ray.geometry_id;
        self.primitive_id[lane] = ray.primitive_id;
        self.u[lane] = ray.u;
        self.v[lane] = ray.v;
        self.transmittance[lane] = ray.transmittance;
    }

    #[inline]
    pub fn is_hit(&self, lane: usize) -> bool {
        self.geometry_id[lane] != INVALID_ID
    }

    #[inline]
    pub fn direction(&self, lane: usize) -> Vec3 {
        Vec3::new(self.dir_x[lane], self.dir_y[lane], self.dir_z[lane])
    }
}
