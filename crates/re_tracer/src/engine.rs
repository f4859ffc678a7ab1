//! The intersection contract the tracer is written against.

use crate::ray::{LaneMask, Ray, RayBatch, PACKET_SIZE};

/// Read-only ray queries over a built scene.
///
/// Implementations must be safe to query from any number of threads while
/// a frame is in flight, and must never report hits beyond a ray's `tfar`
/// (shadow probes rely on this to stop at the light).
pub trait RayCastEngine: Send + Sync {
    /// Find the closest hit in `[tnear, tfar]` and write it back into `ray`.
    ///
    /// On a hit, `tfar` becomes the hit distance and the id/barycentric
    /// fields are filled in. On a miss the hit fields stay `INVALID_ID`.
    fn intersect(&self, ray: &mut Ray);

    /// True if anything blocks the ray in `[tnear, tfar]`.
    fn occluded(&self, ray: &Ray) -> bool;

    /// Intersect every lane selected by `mask`.
    fn intersect_batch(&self, batch: &mut RayBatch, mask: &LaneMask) {
        for lane in mask.lanes() {
            let mut ray = batch.ray(lane);
            self.intersect(&mut ray);
            batch.store_hit(lane, &ray);
        }
    }

    /// Occlusion result per lane; lanes outside `mask` report `false`.
    fn occluded_batch(&self, batch: &RayBatch, mask: &LaneMask) -> [bool; PACKET_SIZE] {
        let mut occluded = [false; PACKET_SIZE];
        for lane in mask.lanes() {
            occluded[lane] = self.occluded(&batch.ray(lane));
        }
        occluded
    }
}

impl<E: RayCastEngine + ?Sized> RayCastEngine for &E {
    fn intersect(&self, ray: &mut Ray) {
        (**self).intersect(ray)
    }

    fn occluded(&self, ray: &Ray) -> bool {
        (**self).occluded(ray)
    }

    fn intersect_batch(&self, batch: &mut RayBatch, mask: &LaneMask) {
        (**self).intersect_batch(batch, mask)
    }

    fn occluded_batch(&self, batch: &RayBatch, mask: &LaneMask) -> [bool; PACKET_SIZE] {
        (**self).occluded_batch(batch, mask)
    }
}

impl<E: RayCastEngine + ?Sized> RayCastEngine for std::sync::Arc<E> {
    fn intersect(&self, ray: &mut Ray) {
        (**self).intersect(ray)
    }

    fn occluded(&self, ray: &Ray) -> bool {
        (**self).occluded(ray)
    }

    fn intersect_batch(&self, batch: &mut RayBatch, mask: &LaneMask) {
        (**self).intersect_batch(batch, mask)
    }

    fn occluded_batch(&self, batch: &RayBatch, mask: &LaneMask) -> [bool; PACKET_SIZE] {
        (**self).occluded_batch(batch, mask)
    }
}
