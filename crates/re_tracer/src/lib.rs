//! RayEngine tracer - Whitted ray tracing over two backends.
//!
//! - [`RecursiveTracer`] traces one ray at a time with recursive mirror
//!   reflections, hard shadows and Phong lighting.
//! - [`PacketTracer`] runs the same algorithm over 4x2 ray packets with
//!   per-lane validity masks.
//! - [`HybridRenderer`] splits each frame by columns between a packet
//!   backend and a scalar backend, and a [`HybridPartitionController`]
//!   rebalances the split from measured frame times.
//!
//! Intersection is behind the [`RayCastEngine`] trait; [`BvhEngine`] is the
//! built-in implementation.

mod backend;
mod bucket;
mod bvh;
mod config;
mod context;
mod engine;
mod hybrid;
mod packet;
mod ray;
mod recursive;
mod renderer;
mod shading;

#[cfg(test)]
mod test_scenes;

pub use backend::{PacketBackend, RenderBackend, ScalarBackend};
pub use bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::BvhEngine;
pub use config::{BatchLightBudget, ConfigError, HybridConfig, RenderMode, RenderSettings, TracerConfig};
pub use context::{sky_uv, PrimaryRays, SceneContext};
pub use engine::RayCastEngine;
pub use hybrid::{HybridPartitionController, PartitionState, Viewport};
pub use packet::{lane_offset, PacketTracer, PACKET_HEIGHT, PACKET_WIDTH};
pub use ray::{LaneMask, Ray, RayBatch, INVALID_ID, PACKET_SIZE};
pub use recursive::RecursiveTracer;
pub use renderer::{color_to_rgba, linear_to_gamma, ColorBuffer, FrameStats, HybridRenderer};
pub use shading::{HitRecord, LightProbe, ShadingEvaluator};

/// Re-export Vec3 and common math types from re_math
pub use re_math::{Aabb, Interval, Vec3};
