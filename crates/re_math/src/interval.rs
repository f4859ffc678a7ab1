/// Closed parametric range `[min, max]` along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// A universe interval (contains everything).
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Returns true if the interval contains nothing.
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    /// Same lower bound, upper bound pulled in to `max` if it is closer.
    pub fn clip_max(&self, max: f32) -> Interval {
        Interval::new(self.min, self.max.min(max))
    }

    /// Overlap of two intervals; empty when they are disjoint.
    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.min.max(other.min), self.max.min(other.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_contains_is_inclusive() {
        let interval = Interval::new(0.01, 5.0);

        assert!(interval.contains(0.01));
        assert!(interval.contains(5.0));
        assert!(!interval.contains(0.0));
        assert!(!interval.contains(5.0001));
    }

    #[test]
    fn test_interval_clip_max() {
        let ray_range = Interval::new(0.01, f32::INFINITY);
        let clipped = ray_range.clip_max(3.0);

        assert_eq!(clipped, Interval::new(0.01, 3.0));
        // Clipping never extends the range
        assert_eq!(clipped.clip_max(10.0), clipped);
    }

    #[test]
    fn test_interval_intersect() {
        let a = Interval::new(0.0, 4.0);
        let b = Interval::new(2.0, 8.0);
        assert_eq!(a.intersect(&b), Interval::new(2.0, 4.0));

        let disjoint = Interval::new(5.0, 6.0);
        assert!(a.intersect(&disjoint).is_empty());
    }

    #[test]
    fn test_interval_constants() {
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(Interval::UNIVERSE.contains(1e30));
        assert_eq!(Interval::UNIVERSE.size(), f32::INFINITY);
    }
}
