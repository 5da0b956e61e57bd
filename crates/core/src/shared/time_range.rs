use serde::{Deserialize, Serialize};

/// A half-open span of timeline seconds, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self, epsilon: f64) -> bool {
        self.duration() <= epsilon
    }

    /// True when the two ranges share more than `epsilon` seconds.
    pub fn overlaps(&self, other: &TimeRange, epsilon: f64) -> bool {
        self.start < other.end - epsilon && other.start < self.end - epsilon
    }

    pub fn contains_range(&self, other: &TimeRange, epsilon: f64) -> bool {
        other.start >= self.start - epsilon && other.end <= self.end + epsilon
    }

    pub fn contains(&self, t: f64) -> bool {
        t > self.start && t < self.end
    }

    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end > start).then_some(TimeRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_duration_never_negative() {
        assert_relative_eq!(TimeRange::new(5.0, 3.0).duration(), 0.0);
        assert_relative_eq!(TimeRange::new(1.0, 3.5).duration(), 2.5);
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let a = TimeRange::new(0.0, 10.0);
        let b = TimeRange::new(10.0, 20.0);
        assert!(!a.overlaps(&b, 1e-3));
        assert!(a.overlaps(&TimeRange::new(9.0, 12.0), 1e-3));
    }

    #[test]
    fn test_contains_range_within_epsilon() {
        let outer = TimeRange::new(10.0, 20.0);
        assert!(outer.contains_range(&TimeRange::new(10.0005, 19.9995), 1e-3));
        assert!(outer.contains_range(&TimeRange::new(9.9995, 20.0005), 1e-3));
        assert!(!outer.contains_range(&TimeRange::new(9.0, 15.0), 1e-3));
    }

    #[test]
    fn test_intersection() {
        let a = TimeRange::new(0.0, 10.0);
        assert_eq!(
            a.intersection(&TimeRange::new(5.0, 15.0)),
            Some(TimeRange::new(5.0, 10.0))
        );
        assert_eq!(a.intersection(&TimeRange::new(10.0, 15.0)), None);
    }
}
