use crate::error::{GeometryError, Result};
use crate::math::{Interval, Point3, Vector3, TOLERANCE};

use super::cylinder::frame;
use super::{wrap_angle, Surface, SurfaceDomain, SurfacePoint};

/// A toroidal surface in 3D space.
///
/// `P(u, v) = center + (R + r*cos(v)) * (cos(u)*ref_dir + sin(u)*binormal) + r*sin(v)*axis`
/// where `binormal = axis x ref_dir`.
///
/// Parameters: `u, v` in `[0, 2*pi]`; both axes close with a seam.
#[derive(Debug, Clone)]
pub struct Torus {
    center: Point3,
    major_radius: f64,
    minor_radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Torus {
    /// Creates a new torus.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the torus
    /// * `major_radius` - Distance from center to tube center (must be positive)
    /// * `minor_radius` - Tube radius (must be positive, must be less than major radius)
    /// * `axis` - Symmetry axis direction (will be normalized)
    /// * `ref_dir` - Reference direction for u=0 (must be perpendicular to axis)
    ///
    /// # Errors
    ///
    /// Returns an error if either radius is non-positive, minor >= major,
    /// or the frame is degenerate.
    pub fn new(
        center: Point3,
        major_radius: f64,
        minor_radius: f64,
        axis: Vector3,
        ref_dir: Vector3,
    ) -> Result<Self> {
        if major_radius < TOLERANCE || minor_radius < TOLERANCE {
            return Err(GeometryError::Degenerate("torus radii must be positive".into()).into());
        }
        if minor_radius >= major_radius {
            return Err(GeometryError::Degenerate(
                "minor radius must be less than major radius".into(),
            )
            .into());
        }
        let (axis, ref_dir) = frame(axis, ref_dir)?;
        Ok(Self {
            center,
            major_radius,
            minor_radius,
            axis,
            ref_dir,
        })
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }

    fn radial(&self, u: f64) -> Vector3 {
        self.ref_dir * u.cos() + self.binormal() * u.sin()
    }
}

impl Surface for Torus {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let r = self.major_radius + self.minor_radius * v.cos();
        Ok(self.center + self.radial(u) * r + self.axis * (self.minor_radius * v.sin()))
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        Ok(self.radial(u) * v.cos() + self.axis * v.sin())
    }

    fn domain(&self) -> SurfaceDomain {
        let full = Interval::new(0.0, std::f64::consts::TAU);
        SurfaceDomain::new(full, full)
    }

    fn closest_point(&self, point: &Point3) -> Result<SurfacePoint> {
        let dp = point - self.center;
        let u = dp.dot(&self.binormal()).atan2(dp.dot(&self.ref_dir));
        let radial = self.radial(u);
        let to_tube = point - (self.center + radial * self.major_radius);
        let v = to_tube.dot(&self.axis).atan2(to_tube.dot(&radial));
        let d = self.domain();
        Ok(SurfacePoint::new(wrap_angle(u, d.u), wrap_angle(v, d.v)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn xy_torus() -> Torus {
        Torus::new(Point3::origin(), 3.0, 1.0, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn evaluate_top() {
        let t = xy_torus();
        let p = t.evaluate(0.0, FRAC_PI_2).unwrap();
        assert!((p - Point3::new(3.0, 0.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn closest_point_roundtrip() {
        let t = xy_torus();
        for &(u, v) in &[(0.5, 0.5), (TAU - 0.1, 4.0), (3.0, TAU - 0.3)] {
            let p = t.evaluate(u, v).unwrap();
            let uv = t.closest_point(&p).unwrap();
            assert!((uv.u() - u).abs() < 1e-9 && (uv.v() - v).abs() < 1e-9, "u={u} v={v}");
        }
    }

    #[test]
    fn minor_exceeds_major() {
        assert!(Torus::new(Point3::origin(), 1.0, 2.0, Vector3::z(), Vector3::x()).is_err());
    }
}
