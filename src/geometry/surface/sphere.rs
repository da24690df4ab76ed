use crate::error::{GeometryError, Result};
use crate::math::{Interval, Point3, Vector3, TOLERANCE};

use super::cylinder::frame;
use super::{wrap_angle, Surface, SurfaceDomain, SurfacePoint};

/// A spherical surface in 3D space.
///
/// `P(u, v) = center + r * cos(v) * (cos(u) * ref_dir + sin(u) * binormal) + r * sin(v) * axis`
/// where `binormal = axis x ref_dir`.
///
/// Parameters: `u` = longitude `[0, 2*pi]`, `v` = latitude `[-pi/2, pi/2]`.
/// The south (`v = -pi/2`) and north (`v = pi/2`) sides collapse to the poles
/// and `u = 0` / `u = 2*pi` form a seam.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the sphere
    /// * `radius` - Radius (must be positive)
    /// * `axis` - North pole direction (will be normalized)
    /// * `ref_dir` - Equatorial reference direction for u=0 (must be perpendicular to axis)
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(center: Point3, radius: f64, axis: Vector3, ref_dir: Vector3) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("sphere radius must be positive".into()).into());
        }
        let (axis, ref_dir) = frame(axis, ref_dir)?;
        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
        })
    }

    /// Returns the center of the sphere.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Sphere {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let cv = v.cos();
        Ok(self.center
            + self.ref_dir * (self.radius * cv * u.cos())
            + self.binormal() * (self.radius * cv * u.sin())
            + self.axis * (self.radius * v.sin()))
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let cv = v.cos();
        let n =
            self.ref_dir * (cv * u.cos()) + self.binormal() * (cv * u.sin()) + self.axis * v.sin();
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(
            Interval::new(0.0, std::f64::consts::TAU),
            Interval::new(-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2),
        )
    }

    fn closest_point(&self, point: &Point3) -> Result<SurfacePoint> {
        let dp = point - self.center;
        let len = dp.norm();
        if len < TOLERANCE {
            return Ok(SurfacePoint::new(0.0, 0.0));
        }
        let dp = dp / len;
        let v = dp.dot(&self.axis).clamp(-1.0, 1.0).asin();
        let u = dp.dot(&self.binormal()).atan2(dp.dot(&self.ref_dir));
        Ok(SurfacePoint::new(wrap_angle(u, self.domain().u), v))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn unit_sphere() -> Sphere {
        Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn poles_collapse() {
        let s = unit_sphere();
        let a = s.evaluate(0.0, FRAC_PI_2).unwrap();
        let b = s.evaluate(3.0, FRAC_PI_2).unwrap();
        assert!((a - b).norm() < 1e-12);
        assert!((a - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn closest_point_wraps_longitude() {
        let s = unit_sphere();
        let p = s.evaluate(TAU - 0.2, 0.4).unwrap();
        let uv = s.closest_point(&(p + (p - Point3::origin()) * 0.5)).unwrap();
        assert!((uv.u() - (TAU - 0.2)).abs() < 1e-9);
        assert!((uv.v() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn normal_outward() {
        let s = unit_sphere();
        let n = s.normal(0.0, 0.0).unwrap();
        assert!((n - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn invalid_radius() {
        assert!(Sphere::new(Point3::origin(), -1.0, Vector3::z(), Vector3::x()).is_err());
    }
}
