use crate::error::{GeometryError, Result};
use crate::math::{Interval, Point3, Vector3, TOLERANCE};

use super::Curve;

/// A circular arc in 3D space.
///
/// Defined by a center, radius, normal axis, and a reference direction
/// for the zero-angle. The parametric form sweeps from `start_angle`
/// to `end_angle` (in radians) around the normal axis.
#[derive(Debug, Clone)]
pub struct Arc {
    center: Point3,
    radius: f64,
    normal: Vector3,
    ref_dir: Vector3,
    start_angle: f64,
    end_angle: f64,
}

impl Arc {
    /// Creates a new arc.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the arc circle
    /// * `radius` - Radius (must be positive)
    /// * `normal` - Normal vector defining the arc plane
    /// * `ref_dir` - Reference direction for angle = 0 (must be perpendicular to normal)
    /// * `start_angle` - Start angle in radians
    /// * `end_angle` - End angle in radians
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, the normal is zero-length,
    /// or the reference direction is not perpendicular to the normal.
    pub fn new(
        center: Point3,
        radius: f64,
        normal: Vector3,
        ref_dir: Vector3,
        start_angle: f64,
        end_angle: f64,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("arc radius must be positive".into()).into());
        }

        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / normal_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let ref_dir = ref_dir / ref_len;

        if normal.dot(&ref_dir).abs() > 1e-8 {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to normal".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            radius,
            normal,
            ref_dir,
            start_angle,
            end_angle,
        })
    }

    /// Creates the arc that leaves `start` along `tangent` and ends at `target`.
    ///
    /// Returns `Ok(None)` when `target` lies on the tangent line, where the
    /// arc degenerates to a straight segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the tangent is zero-length.
    pub fn tangent_to_point(
        start: Point3,
        tangent: Vector3,
        target: Point3,
    ) -> Result<Option<Self>> {
        let t_len = tangent.norm();
        if t_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let tangent = tangent / t_len;
        let chord = target - start;
        let chord_len = chord.norm();
        if chord_len < TOLERANCE {
            return Ok(None);
        }
        let lateral = chord - tangent * chord.dot(&tangent);
        let lateral_len = lateral.norm();
        if lateral_len < 1e-9 * chord_len {
            return Ok(None);
        }
        let to_center = lateral / lateral_len;
        let radius = chord_len * chord_len / (2.0 * chord.dot(&to_center));
        let center = start + to_center * radius;
        let ref_dir = -to_center;
        let normal = ref_dir.cross(&tangent);

        let a = start - center;
        let b = target - center;
        let mut sweep = normal.dot(&a.cross(&b)).atan2(a.dot(&b));
        if sweep < 0.0 {
            sweep += std::f64::consts::TAU;
        }
        Self::new(center, radius, normal, ref_dir, 0.0, sweep).map(Some)
    }

    /// Creates the arc of given `radius` and arc `length` that leaves `start`
    /// along `tangent`, bending towards `to_center`.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive or the directions are degenerate.
    pub fn from_curvature(
        start: Point3,
        tangent: Vector3,
        to_center: Vector3,
        radius: f64,
        length: f64,
    ) -> Result<Self> {
        let t_len = tangent.norm();
        if t_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let tangent = tangent / t_len;
        let lateral = to_center - tangent * to_center.dot(&tangent);
        let lateral_len = lateral.norm();
        if lateral_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let to_center = lateral / lateral_len;
        let center = start + to_center * radius;
        let ref_dir = -to_center;
        let normal = ref_dir.cross(&tangent);
        Self::new(center, radius, normal, ref_dir, 0.0, length / radius)
    }

    /// Returns the center of the arc.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius of the arc.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the normal vector of the arc plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Arc length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.radius * (self.end_angle - self.start_angle).abs()
    }

    /// Computes the second axis direction (perpendicular to both normal and `ref_dir`).
    fn binormal(&self) -> Vector3 {
        self.normal.cross(&self.ref_dir)
    }
}

impl Curve for Arc {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let x = self.radius * t.cos();
        let y = self.radius * t.sin();
        Ok(self.center + self.ref_dir * x + binormal * y)
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        let binormal = self.binormal();
        let dx = -self.radius * t.sin();
        let dy = self.radius * t.cos();
        let tangent = self.ref_dir * dx + binormal * dy;
        let len = tangent.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(tangent / len)
    }

    fn domain(&self) -> Interval {
        Interval::new(self.start_angle, self.end_angle)
    }

    fn is_closed(&self) -> bool {
        (self.end_angle - self.start_angle - std::f64::consts::TAU).abs() < TOLERANCE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tangent_to_point_hits_target() {
        let start = Point3::new(0.0, 0.0, 0.0);
        let target = Point3::new(1.0, 1.0, 0.0);
        let arc = Arc::tangent_to_point(start, Vector3::x(), target)
            .unwrap()
            .unwrap();
        let d = arc.domain();
        let p0 = arc.evaluate(d.min).unwrap();
        let p1 = arc.evaluate(d.max).unwrap();
        assert!((p0 - start).norm() < 1e-9);
        assert!((p1 - target).norm() < 1e-9);
        assert!((arc.radius() - 1.0).abs() < 1e-9);
        let t0 = arc.tangent(d.min).unwrap();
        assert!((t0 - Vector3::x()).norm() < 1e-9);
    }

    #[test]
    fn tangent_to_point_collinear_is_none() {
        let r = Arc::tangent_to_point(Point3::origin(), Vector3::x(), Point3::new(4.0, 0.0, 0.0))
            .unwrap();
        assert!(r.is_none());
    }

    #[test]
    fn target_behind_start_sweeps_past_half_turn() {
        let arc = Arc::tangent_to_point(Point3::origin(), Vector3::x(), Point3::new(-1.0, 1.0, 0.0))
            .unwrap()
            .unwrap();
        let d = arc.domain();
        assert!(d.max > std::f64::consts::PI);
        let p1 = arc.evaluate(d.max).unwrap();
        assert!((p1 - Point3::new(-1.0, 1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn from_curvature_length() {
        let arc =
            Arc::from_curvature(Point3::origin(), Vector3::x(), Vector3::y(), 2.0, 1.0).unwrap();
        assert!((arc.length() - 1.0).abs() < 1e-12);
        let p = arc.evaluate(arc.domain().max).unwrap();
        assert!(p.y > 0.0);
    }

    #[test]
    fn invalid_radius() {
        let r = Arc::new(Point3::origin(), 0.0, Vector3::z(), Vector3::x(), 0.0, 1.0);
        assert!(r.is_err());
    }
}
