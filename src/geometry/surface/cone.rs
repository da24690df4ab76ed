use crate::error::{GeometryError, Result};
use crate::math::{Interval, Point3, Vector3, TOLERANCE};

use super::cylinder::frame;
use super::{wrap_angle, Surface, SurfaceDomain, SurfacePoint};

/// A conical surface starting at its apex.
///
/// `P(u, v) = apex + v * (cos(alpha) * axis + sin(alpha) * (cos(u) * ref_dir + sin(u) * binormal))`
/// where `binormal = axis x ref_dir` and `alpha` is the half-angle.
///
/// `v` in `[0, length]` measures distance along the generator, so the
/// `v = 0` side collapses to the apex.
#[derive(Debug, Clone)]
pub struct Cone {
    apex: Point3,
    axis: Vector3,
    half_angle: f64,
    ref_dir: Vector3,
    length: f64,
}

impl Cone {
    /// Creates a new cone.
    ///
    /// # Arguments
    ///
    /// * `apex` - The apex (tip) of the cone
    /// * `axis` - Axis direction from apex outward (will be normalized)
    /// * `half_angle` - Half-angle in radians (must be in `(0, pi/2)`)
    /// * `ref_dir` - Reference direction for u=0 (must be perpendicular to axis)
    /// * `length` - Generator length
    ///
    /// # Errors
    ///
    /// Returns an error if the half-angle is out of range, the length is not
    /// positive, or the frame is degenerate.
    pub fn new(
        apex: Point3,
        axis: Vector3,
        half_angle: f64,
        ref_dir: Vector3,
        length: f64,
    ) -> Result<Self> {
        if half_angle <= 0.0 || half_angle >= std::f64::consts::FRAC_PI_2 {
            return Err(
                GeometryError::Degenerate("cone half-angle must be in (0, pi/2)".into()).into(),
            );
        }
        if length < TOLERANCE {
            return Err(GeometryError::Degenerate("cone length must be positive".into()).into());
        }
        let (axis, ref_dir) = frame(axis, ref_dir)?;
        Ok(Self {
            apex,
            axis,
            half_angle,
            ref_dir,
            length,
        })
    }

    /// Returns the apex point.
    #[must_use]
    pub fn apex(&self) -> &Point3 {
        &self.apex
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }

    fn generator(&self, u: f64) -> Vector3 {
        let radial = self.ref_dir * u.cos() + self.binormal() * u.sin();
        self.axis * self.half_angle.cos() + radial * self.half_angle.sin()
    }
}

impl Surface for Cone {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        Ok(self.apex + self.generator(u) * v)
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        if v.abs() < TOLERANCE {
            return Err(
                GeometryError::Degenerate("cone normal is degenerate at apex".into()).into(),
            );
        }
        let binormal = self.binormal();
        let du = (-self.ref_dir * u.sin() + binormal * u.cos()) * (v * self.half_angle.sin());
        let n = du.cross(&self.generator(u));
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(
            Interval::new(0.0, std::f64::consts::TAU),
            Interval::new(0.0, self.length),
        )
    }

    fn is_linear(&self, axis: usize) -> bool {
        axis == 1
    }

    fn closest_point(&self, point: &Point3) -> Result<SurfacePoint> {
        let dp = point - self.apex;
        let u = dp.dot(&self.binormal()).atan2(dp.dot(&self.ref_dir));
        let u = wrap_angle(u, self.domain().u);
        let v = Interval::new(0.0, self.length).clamp(dp.dot(&self.generator(u)));
        Ok(SurfacePoint::new(u, v))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn z_cone_45() -> Cone {
        Cone::new(Point3::origin(), Vector3::z(), FRAC_PI_4, Vector3::x(), 4.0).unwrap()
    }

    #[test]
    fn apex_side_collapses() {
        let c = z_cone_45();
        let a = c.evaluate(0.0, 0.0).unwrap();
        let b = c.evaluate(2.0, 0.0).unwrap();
        assert!((a - b).norm() < TOLERANCE);
    }

    #[test]
    fn evaluate_along_generator() {
        let c = z_cone_45();
        let p = c.evaluate(0.0, 2.0_f64.sqrt()).unwrap();
        assert!((p - Point3::new(1.0, 0.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn closest_point_roundtrip() {
        let c = z_cone_45();
        for &(u, v) in &[(0.3, 1.0), (4.0, 3.5), (6.0, 0.5)] {
            let p = c.evaluate(u, v).unwrap();
            let uv = c.closest_point(&p).unwrap();
            assert!((uv.u() - u).abs() < 1e-9 && (uv.v() - v).abs() < 1e-9, "u={u} v={v}");
        }
    }

    #[test]
    fn normal_degenerate_at_apex() {
        assert!(z_cone_45().normal(0.0, 0.0).is_err());
    }

    #[test]
    fn invalid_half_angle() {
        assert!(Cone::new(Point3::origin(), Vector3::z(), 0.0, Vector3::x(), 1.0).is_err());
    }
}
