use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain, SurfacePoint};

/// A bounded planar patch.
///
/// Defined by an origin point, two orthonormalized direction vectors
/// (`u_dir`, `v_dir`) and a parameter rectangle. The normal is `u_dir x v_dir`.
///
/// Parametric form: `P(u, v) = origin + u * u_dir + v * v_dir`.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
    domain: SurfaceDomain,
}

impl Plane {
    /// Creates a new planar patch.
    ///
    /// `v_dir` is made orthogonal to `u_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vectors are zero-length
    /// or parallel (degenerate plane).
    pub fn new(
        origin: Point3,
        u_dir: Vector3,
        v_dir: Vector3,
        domain: SurfaceDomain,
    ) -> Result<Self> {
        let u_len = u_dir.norm();
        if u_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let u_dir = u_dir / u_len;

        let v_dir = v_dir - u_dir * v_dir.dot(&u_dir);
        let v_len = v_dir.norm();
        if v_len < TOLERANCE {
            return Err(GeometryError::Degenerate("plane directions are parallel".into()).into());
        }
        let v_dir = v_dir / v_len;

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal: u_dir.cross(&v_dir),
            domain,
        })
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the normal vector of the plane.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }
}

impl Surface for Plane {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        Ok(self.origin + self.u_dir * u + self.v_dir * v)
    }

    fn normal(&self, _u: f64, _v: f64) -> Result<Vector3> {
        Ok(self.normal)
    }

    fn domain(&self) -> SurfaceDomain {
        self.domain
    }

    fn is_linear(&self, _axis: usize) -> bool {
        true
    }

    fn partials(&self, _u: f64, _v: f64) -> Result<(Vector3, Vector3)> {
        Ok((self.u_dir, self.v_dir))
    }

    fn closest_point(&self, point: &Point3) -> Result<SurfacePoint> {
        let d = point - self.origin;
        let mut uv = SurfacePoint::new(d.dot(&self.u_dir), d.dot(&self.v_dir));
        self.domain.clamp(&mut uv);
        Ok(uv)
    }
}
