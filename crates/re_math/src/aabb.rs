use crate::{Interval, Vec3};

/// Axis-aligned bounding box used by the BVH.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box that contains nothing; the identity for `surrounding`.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create an AABB from two corner points, in any order.
    ///
    /// Flat boxes are padded so the slab test never divides a zero-width
    /// slab (axis-aligned triangles are flat on one axis).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let delta = Vec3::splat(0.0001);
        let min = a.min(b);
        let max = a.max(b);
        let pad = Vec3::select((max - min).cmplt(delta), delta * 0.5, Vec3::ZERO);
        Self {
            min: min - pad,
            max: max + pad,
        }
    }

    /// Bounds of a triangle.
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max.cmplt(self.min).any()
    }

    /// Slab test against a ray given by origin and reciprocal direction.
    ///
    /// `inv_dir` components may be infinite for axis-parallel rays; the
    /// min/max formulation handles that without branching.
    pub fn hit(&self, origin: Vec3, inv_dir: Vec3, ray_t: Interval) -> bool {
        let t0 = (self.min - origin) * inv_dir;
        let t1 = (self.max - origin) * inv_dir;
        let t_enter = t0.min(t1).max_element().max(ray_t.min);
        let t_exit = t0.max(t1).min_element().min(ray_t.max);
        t_enter <= t_exit
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let size = self.max - self.min;
        if size.x > size.y && size.x > size.z {
            0
        } else if size.y > size.z {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}
