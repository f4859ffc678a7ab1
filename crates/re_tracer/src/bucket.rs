//! Bucket-based tile scheduling for the packet backend.
//!
//! Divides a viewport into tiles (buckets) that are rendered independently
//! and in parallel using rayon.

use re_core::Color;

use crate::hybrid::Viewport;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner, in full-frame pixels
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn x_end(&self) -> u32 {
        self.x + self.width
    }

    pub fn y_end(&self) -> u32 {
        self.y + self.height
    }
}

/// Default bucket size in pixels. A multiple of both packet dimensions so
/// interior buckets never carry partial packets.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// Generate buckets covering `viewport`, sorted in spiral order from its
/// centre.
pub fn generate_buckets(viewport: Viewport, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();
    let mut index = 0;

    let mut y = 0;
    while y < viewport.height {
        let mut x = viewport.x;
        while x < viewport.x_end() {
            let bw = bucket_size.min(viewport.x_end() - x);
            let bh = bucket_size.min(viewport.height - y);
            buckets.push(Bucket::new(x, y, bw, bh, index));
            index += 1;
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, viewport);

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from the viewport centre.
fn sort_spiral(buckets: &mut [Bucket], viewport: Viewport) {
    let center_x = viewport.x as f32 + viewport.width as f32 / 2.0;
    let center_y = viewport.height as f32 / 2.0;

    let distance = |b: &Bucket| {
        let dx = b.x as f32 + b.width as f32 / 2.0 - center_x;
        let dy = b.y as f32 + b.height as f32 / 2.0 - center_y;
        dx * dx + dy * dy
    };

    buckets.sort_by(|a, b| distance(a).partial_cmp(&distance(b)).unwrap_or(std::cmp::Ordering::Equal));
}

/// Result of rendering a bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Pixel colors in row-major order
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}
