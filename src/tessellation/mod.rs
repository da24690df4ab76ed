mod tessellate_curve;

pub use tessellate_curve::TessellateCurve;

use crate::math::{to_f64, Point3};

/// Parameters controlling curve sampling density.
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Minimum number of segments for curves.
    pub min_segments: usize,
    /// Maximum number of segments for curves.
    pub max_segments: usize,
    /// Segments per unit of 3D length.
    pub segments_per_unit: f64,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            min_segments: 20,
            max_segments: 1000,
            segments_per_unit: 100.0,
        }
    }
}

impl TessellationParams {
    /// Segment count for a curve of the given 3D length.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn segments_for_length(&self, length: f64) -> usize {
        let wanted = if length.is_finite() && length > 0.0 {
            (length * self.segments_per_unit).ceil() as usize
        } else {
            self.min_segments
        };
        wanted.clamp(self.min_segments, self.max_segments.max(self.min_segments))
    }
}

/// A polyline approximation of a curve.
///
/// `params[i]` is the curve parameter that produced `points[i]`.
#[derive(Debug, Clone, Default)]
pub struct Polyline {
    /// The ordered vertices of the polyline.
    pub points: Vec<Point3>,
    /// Curve parameters of the vertices.
    pub params: Vec<f64>,
}

impl Polyline {
    /// Total length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }

    /// Shortest distance from `point` to the polyline.
    #[must_use]
    pub fn distance_to(&self, point: &Point3) -> f64 {
        match self.points.as_slice() {
            [] => f64::INFINITY,
            [only] => (point - only).norm(),
            pts => pts
                .windows(2)
                .map(|w| segment_distance(point, &w[0], &w[1]))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Largest distance between vertices with the same index.
    ///
    /// Returns infinity when the vertex counts differ.
    #[must_use]
    pub fn max_pairwise_distance(&self, other: &Polyline) -> f64 {
        if self.points.len() != other.points.len() {
            return f64::INFINITY;
        }
        self.points
            .iter()
            .zip(&other.points)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    /// Two-sided maximum of vertex-to-polyline distances.
    #[must_use]
    pub fn max_distance_between(&self, other: &Polyline) -> f64 {
        let there = self.points.iter().map(|p| other.distance_to(p)).fold(0.0, f64::max);
        let back = other.points.iter().map(|p| self.distance_to(p)).fold(0.0, f64::max);
        there.max(back)
    }

    /// Largest turning angle at an interior vertex, in radians.
    #[must_use]
    pub fn max_turning_angle(&self) -> f64 {
        self.points
            .windows(3)
            .map(|w| crate::math::turning_angle(&w[0], &w[1], &w[2]))
            .fold(0.0, f64::max)
    }

    /// Vertex at normalized position `fraction` of the vertex list.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn vertex_at_fraction(&self, fraction: f64) -> Option<Point3> {
        let last = self.points.len().checked_sub(1)?;
        let idx = (fraction.clamp(0.0, 1.0) * to_f64(last)).round() as usize;
        self.points.get(idx).copied()
    }
}

fn segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::MIN_POSITIVE {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(n: usize) -> Polyline {
        Polyline {
            points: (0..=n).map(|i| Point3::new(to_f64(i), 0.0, 0.0)).collect(),
            params: (0..=n).map(to_f64).collect(),
        }
    }

    #[test]
    fn length_and_distance() {
        let p = line(4);
        assert!((p.length() - 4.0).abs() < 1e-12);
        assert!((p.distance_to(&Point3::new(2.5, 1.0, 0.0)) - 1.0).abs() < 1e-12);
        assert!((p.distance_to(&Point3::new(-3.0, 0.0, 0.0)) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn pairwise_requires_same_count() {
        assert!(line(3).max_pairwise_distance(&line(4)).is_infinite());
        assert!(line(3).max_pairwise_distance(&line(3)) < 1e-12);
    }

    #[test]
    fn two_sided_distance() {
        let a = line(2);
        let mut b = line(2);
        b.points[1].y = 0.5;
        assert!((a.max_distance_between(&b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn segment_count_scales_with_length() {
        let p = TessellationParams::default();
        assert_eq!(p.segments_for_length(0.01), 20);
        assert_eq!(p.segments_for_length(3.0), 300);
        assert_eq!(p.segments_for_length(1e6), 1000);
    }
}
