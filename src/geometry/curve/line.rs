use crate::error::{GeometryError, Result};
use crate::math::{Interval, Point3, Vector3, TOLERANCE};

use super::Curve;

/// A bounded straight segment defined by an origin, a unit direction and a length.
///
/// The parametric form is: `P(t) = origin + t * direction`, `t` in `[0, length]`.
#[derive(Debug, Clone)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
    length: f64,
}

impl Line {
    /// Creates a new segment from an origin, direction and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vector is zero-length or the length is negative.
    pub fn new(origin: Point3, direction: Vector3, length: f64) -> Result<Self> {
        let len = direction.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        if length < 0.0 {
            return Err(
                GeometryError::Degenerate("segment length must not be negative".into()).into(),
            );
        }
        Ok(Self {
            origin,
            direction: direction / len,
            length,
        })
    }

    /// Creates the segment from `a` to `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if the points coincide.
    pub fn between(a: Point3, b: Point3) -> Result<Self> {
        let d = b - a;
        Self::new(a, d, d.norm())
    }

    /// Returns the origin point of the segment.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction vector of the segment.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Returns the segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Parameter of the point on the infinite carrier line closest to `point`.
    #[must_use]
    pub fn project(&self, point: &Point3) -> f64 {
        (point - self.origin).dot(&self.direction)
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.origin + self.direction * t)
    }

    fn tangent(&self, _t: f64) -> Result<Vector3> {
        Ok(self.direction)
    }

    fn domain(&self) -> Interval {
        Interval::new(0.0, self.length)
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn between_points() {
        let l = Line::between(Point3::origin(), Point3::new(3.0, 4.0, 0.0)).unwrap();
        assert!((l.length() - 5.0).abs() < 1e-12);
        let p = l.evaluate(l.domain().max).unwrap();
        assert!((p - Point3::new(3.0, 4.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn coincident_points_rejected() {
        assert!(Line::between(Point3::origin(), Point3::origin()).is_err());
    }

    #[test]
    fn projection() {
        let l = Line::new(Point3::origin(), Vector3::x(), 2.0).unwrap();
        assert!((l.project(&Point3::new(5.0, 1.0, 0.0)) - 5.0).abs() < 1e-12);
    }
}
