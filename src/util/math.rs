//! Geometry helpers shared by templates, matches and classification.

use serde::{Deserialize, Serialize};

/// A point in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a point from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Returns the point with both coordinates divided by `scale`.
    pub fn unscaled(&self, scale: f64) -> Point {
        Point::new(self.x / scale, self.y / scale)
    }
}

/// Blends an observed background correlation with a strictness knob.
///
/// `strictness = 0` returns `background`, `strictness = 1` returns 1.
pub(crate) fn strict_threshold(strictness: f64, background: f64) -> f64 {
    strictness + (1.0 - strictness) * background
}

#[cfg(test)]
mod tests {
    use super::{strict_threshold, Point};

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
        assert!((b.distance(a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn unscaled_divides_both_axes() {
        let p = Point::new(10.0, 4.0).unscaled(0.5);
        assert_eq!(p, Point::new(20.0, 8.0));
    }

    #[test]
    fn strict_threshold_interpolates_towards_one() {
        assert!((strict_threshold(0.0, 0.8) - 0.8).abs() < 1e-12);
        assert!((strict_threshold(1.0, 0.3) - 1.0).abs() < 1e-12);
        assert!((strict_threshold(0.25, 0.8) - 0.85).abs() < 1e-12);
    }
}
