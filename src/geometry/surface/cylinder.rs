use crate::error::{GeometryError, Result};
use crate::math::{Interval, Point3, Vector3, TOLERANCE};

use super::{wrap_angle, Surface, SurfaceDomain, SurfacePoint};

/// A cylindrical surface in 3D space, bounded along its axis.
///
/// Defined by a center point on the axis, radius, axis direction, a
/// reference direction for u=0 and the height range.
///
/// `P(u, v) = center + radius * cos(u) * ref_dir + radius * sin(u) * binormal + v * axis`
/// where `binormal = axis x ref_dir`, `u` in `[0, 2*pi]`.
///
/// The `u = 0` and `u = 2*pi` boundaries form a seam.
#[derive(Debug, Clone)]
pub struct Cylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
    height: Interval,
}

impl Cylinder {
    /// Creates a new cylinder.
    ///
    /// # Arguments
    ///
    /// * `center` - A point on the cylinder axis
    /// * `radius` - Radius (must be positive)
    /// * `axis` - Axis direction (will be normalized)
    /// * `ref_dir` - Reference direction for u=0 (must be perpendicular to axis)
    /// * `height` - Range of `v` along the axis
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(
        center: Point3,
        radius: f64,
        axis: Vector3,
        ref_dir: Vector3,
        height: Interval,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("cylinder radius must be positive".into()).into());
        }
        let (axis, ref_dir) = frame(axis, ref_dir)?;
        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
            height,
        })
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

/// Normalizes an axis and a reference direction perpendicular to it.
pub(super) fn frame(axis: Vector3, ref_dir: Vector3) -> Result<(Vector3, Vector3)> {
    let axis_len = axis.norm();
    if axis_len < TOLERANCE {
        return Err(GeometryError::ZeroVector.into());
    }
    let axis = axis / axis_len;

    let ref_len = ref_dir.norm();
    if ref_len < TOLERANCE {
        return Err(GeometryError::ZeroVector.into());
    }
    let ref_dir = ref_dir / ref_len;

    if axis.dot(&ref_dir).abs() > 1e-8 {
        return Err(GeometryError::Degenerate(
            "reference direction must be perpendicular to axis".into(),
        )
        .into());
    }
    Ok((axis, ref_dir))
}

impl Surface for Cylinder {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let x = self.radius * u.cos();
        let y = self.radius * u.sin();
        Ok(self.center + self.ref_dir * x + binormal * y + self.axis * v)
    }

    fn normal(&self, u: f64, _v: f64) -> Result<Vector3> {
        let binormal = self.binormal();
        Ok(self.ref_dir * u.cos() + binormal * u.sin())
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(Interval::new(0.0, std::f64::consts::TAU), self.height)
    }

    fn is_linear(&self, axis: usize) -> bool {
        axis == 1
    }

    fn closest_point(&self, point: &Point3) -> Result<SurfacePoint> {
        let dp = point - self.center;
        let v = self.height.clamp(dp.dot(&self.axis));
        let u = dp.dot(&self.binormal()).atan2(dp.dot(&self.ref_dir));
        Ok(SurfacePoint::new(wrap_angle(u, self.domain().u), v))
    }
}
