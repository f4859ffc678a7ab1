//! RayEngine math foundation.
//!
//! Re-exports glam and adds the small set of geometric helpers the tracer
//! and the reference ray-cast engine share.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;

pub use aabb::Aabb;
pub use interval::Interval;

/// Mirror `v` about the normal `n`: `2 (v·n) n - v`.
///
/// Both vectors are expected to point away from the surface. Used for the
/// Phong highlight (`reflect(L, N)`) and for mirror rays
/// (`reflect(-D, N)`). A zero-length `v` yields zero.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    2.0 * v.dot(n) * n - v
}
