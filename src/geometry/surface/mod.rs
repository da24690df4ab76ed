mod cone;
mod cylinder;
mod nurbs;
mod on_surface;
mod plane;
mod sphere;
mod torus;

pub use cone::Cone;
pub use cylinder::Cylinder;
pub use nurbs::NurbsSurface;
pub use on_surface::{length_on_surface, push_up};
pub use plane::Plane;
pub use sphere::Sphere;
pub use torus::Torus;

use std::ops::{Index, IndexMut};

use crate::error::Result;
use crate::math::{to_f64, Interval, Point3, Vector3, TOLERANCE};

/// A `(u, v)` parameter pair, addressable by axis (0 = u, 1 = v).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfacePoint {
    uv: [f64; 2],
}

impl SurfacePoint {
    /// Creates a surface point.
    #[must_use]
    pub fn new(u: f64, v: f64) -> Self {
        Self { uv: [u, v] }
    }

    /// The `u` coordinate.
    #[must_use]
    pub fn u(&self) -> f64 {
        self.uv[0]
    }

    /// The `v` coordinate.
    #[must_use]
    pub fn v(&self) -> f64 {
        self.uv[1]
    }

    /// Parameter-space distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.uv[0] - other.uv[0]).hypot(self.uv[1] - other.uv[1])
    }

    /// Embeds the pair as a `z = 0` point, the storage of 2D curve control points.
    #[must_use]
    pub fn to_point3(self) -> Point3 {
        Point3::new(self.uv[0], self.uv[1], 0.0)
    }

    /// Reads the `x, y` coordinates of a 2D curve point.
    #[must_use]
    pub fn from_point3(p: &Point3) -> Self {
        Self::new(p.x, p.y)
    }

    /// Returns true if both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.uv.iter().all(|c| c.is_finite())
    }
}

impl Index<usize> for SurfacePoint {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        &self.uv[axis]
    }
}

impl IndexMut<usize> for SurfacePoint {
    fn index_mut(&mut self, axis: usize) -> &mut f64 {
        &mut self.uv[axis]
    }
}

/// Parameter rectangle of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    /// U parameter range.
    pub u: Interval,
    /// V parameter range.
    pub v: Interval,
}

impl SurfaceDomain {
    /// Creates a new surface domain.
    #[must_use]
    pub fn new(u: Interval, v: Interval) -> Self {
        Self { u, v }
    }

    /// Range along `axis` (0 = u, anything else = v).
    #[must_use]
    pub fn axis(&self, axis: usize) -> Interval {
        if axis == 0 {
            self.u
        } else {
            self.v
        }
    }

    /// Returns true if `point` lies inside the rectangle, within `tol`.
    #[must_use]
    pub fn contains(&self, point: &SurfacePoint, tol: f64) -> bool {
        self.u.contains(point.u(), tol) && self.v.contains(point.v(), tol)
    }

    /// Clamps `point` onto the rectangle. Returns true if it moved.
    ///
    /// Non-finite coordinates are replaced by the range midpoint.
    pub fn clamp(&self, point: &mut SurfacePoint) -> bool {
        let mut moved = false;
        for axis in 0..2 {
            let range = self.axis(axis);
            let value = if point[axis].is_finite() {
                range.clamp(point[axis])
            } else {
                range.mid()
            };
            #[allow(clippy::float_cmp)]
            if value != point[axis] {
                point[axis] = value;
                moved = true;
            }
        }
        moved
    }

    /// Bounding rectangle of `points`, or `None` if there are no finite points.
    #[must_use]
    pub fn enclosing(points: &[SurfacePoint]) -> Option<Self> {
        let u = Interval::enclosing(points.iter().map(SurfacePoint::u))?;
        let v = Interval::enclosing(points.iter().map(SurfacePoint::v))?;
        Some(Self { u, v })
    }
}

/// Trait for parametric surfaces in 3D space.
pub trait Surface {
    /// Evaluates the surface at parameters `(u, v)`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or evaluation fails.
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3>;

    /// Computes the surface normal at parameters `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or the normal is degenerate.
    fn normal(&self, u: f64, v: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the surface.
    fn domain(&self) -> SurfaceDomain;

    /// Returns true if the surface is of degree 1 along `axis`.
    fn is_linear(&self, _axis: usize) -> bool {
        false
    }

    /// Evaluates the surface at a [`SurfacePoint`].
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails.
    fn point_at(&self, point: &SurfacePoint) -> Result<Point3> {
        self.evaluate(point.u(), point.v())
    }

    /// First partial derivatives `(S_u, S_v)` by central differences.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails.
    fn partials(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)> {
        let d = self.domain();
        let hu = d.u.length().max(TOLERANCE) * 1e-6;
        let hv = d.v.length().max(TOLERANCE) * 1e-6;
        let su = (self.evaluate(u + hu, v)? - self.evaluate(u - hu, v)?) / (2.0 * hu);
        let sv = (self.evaluate(u, v + hv)? - self.evaluate(u, v - hv)?) / (2.0 * hv);
        Ok((su, sv))
    }

    /// Parameters of the surface point closest to `point`.
    ///
    /// The default samples a 33 x 33 grid and refines the best sample with
    /// Gauss-Newton steps, staying inside the domain.
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails.
    fn closest_point(&self, point: &Point3) -> Result<SurfacePoint> {
        const GRID: usize = 32;
        let d = self.domain();
        let mut best = SurfacePoint::new(d.u.min, d.v.min);
        let mut best_dist = f64::INFINITY;
        for i in 0..=GRID {
            for j in 0..=GRID {
                let candidate = SurfacePoint::new(
                    d.u.parameter_at(to_f64(i) / to_f64(GRID)),
                    d.v.parameter_at(to_f64(j) / to_f64(GRID)),
                );
                let dist = (self.point_at(&candidate)? - point).norm_squared();
                if dist < best_dist {
                    best_dist = dist;
                    best = candidate;
                }
            }
        }
        newton_refine(self, point, best)
    }
}

/// Gauss-Newton refinement of a closest-point guess, clamped to the domain.
///
/// # Errors
///
/// Returns an error if evaluation fails.
pub fn newton_refine<S: Surface + ?Sized>(
    surface: &S,
    target: &Point3,
    start: SurfacePoint,
) -> Result<SurfacePoint> {
    let d = surface.domain();
    let mut current = start;
    let mut dist = (surface.point_at(&current)? - target).norm_squared();
    for _ in 0..40 {
        let r = surface.point_at(&current)? - target;
        let (su, sv) = surface.partials(current.u(), current.v())?;
        let a = su.dot(&su);
        let b = su.dot(&sv);
        let c = sv.dot(&sv);
        let det = a * c - b * b;
        if det.abs() < 1e-24 {
            break;
        }
        let gu = su.dot(&r);
        let gv = sv.dot(&r);
        let du = -(c * gu - b * gv) / det;
        let dv = -(a * gv - b * gu) / det;

        let mut step = 1.0;
        let mut improved = false;
        for _ in 0..10 {
            let mut next = SurfacePoint::new(current.u() + du * step, current.v() + dv * step);
            d.clamp(&mut next);
            let next_dist = (surface.point_at(&next)? - target).norm_squared();
            if next_dist < dist {
                let moved = next.distance(&current);
                current = next;
                dist = next_dist;
                improved = moved > 1e-15;
                break;
            }
            step *= 0.5;
        }
        if !improved {
            break;
        }
    }
    Ok(current)
}

/// Wraps an angle into `[range.min, range.min + TAU)` when it is a full turn.
pub(crate) fn wrap_angle(angle: f64, range: Interval) -> f64 {
    let tau = std::f64::consts::TAU;
    if (range.length() - tau).abs() > 1e-9 {
        return range.clamp(angle);
    }
    let mut a = (angle - range.min).rem_euclid(tau) + range.min;
    if a >= range.max {
        a = range.min;
    }
    a
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn surface_point_axis_access() {
        let mut p = SurfacePoint::new(1.0, 2.0);
        assert!((p[0] - 1.0).abs() < f64::EPSILON);
        p[1] = 5.0;
        assert!((p.v() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_moves_outside_points() {
        let d = SurfaceDomain::new(Interval::new(0.0, 1.0), Interval::new(0.0, 2.0));
        let mut p = SurfacePoint::new(-3.0, 7.0);
        assert!(d.clamp(&mut p));
        assert_eq!(p, SurfacePoint::new(0.0, 2.0));
        let mut q = SurfacePoint::new(0.5, 0.5);
        assert!(!d.clamp(&mut q));
    }

    #[test]
    fn clamp_replaces_nan() {
        let d = SurfaceDomain::new(Interval::new(0.0, 1.0), Interval::new(0.0, 2.0));
        let mut p = SurfacePoint::new(f64::NAN, 1.0);
        assert!(d.clamp(&mut p));
        assert!(p.is_finite());
    }

    #[test]
    fn wrap_angle_into_range() {
        let r = Interval::new(0.0, std::f64::consts::TAU);
        assert!((wrap_angle(-0.5, r) - (std::f64::consts::TAU - 0.5)).abs() < 1e-12);
        assert!(wrap_angle(std::f64::consts::TAU, r).abs() < 1e-12);
    }

    #[test]
    fn enclosing_domain() {
        let pts = [SurfacePoint::new(1.0, 3.0), SurfacePoint::new(-1.0, 4.0)];
        let d = SurfaceDomain::enclosing(&pts).unwrap();
        assert!((d.u.min + 1.0).abs() < 1e-12);
        assert!((d.v.max - 4.0).abs() < 1e-12);
    }
}
