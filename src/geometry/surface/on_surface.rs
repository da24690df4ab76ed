//! Conversions between parameter-space curves and their 3D images.

use crate::error::{OperationError, Result};
use crate::geometry::nurbs::NurbsCurve;
use crate::math::{to_f64, Point3};

use super::{Surface, SurfacePoint};

/// Maps a 2D parameter-space curve through `surface` into a 3D curve.
///
/// The 3D curve interpolates the surface images of `samples + 1` points taken
/// at uniform parameters and keeps the 2D curve's parameterization.
///
/// # Errors
///
/// Returns [`OperationError::InvalidInput`] if `curve` is not 2D, or an error
/// if evaluation or interpolation fails.
pub fn push_up<S: Surface + ?Sized>(
    curve: &NurbsCurve,
    surface: &S,
    samples: usize,
) -> Result<NurbsCurve> {
    if curve.dimension() != 2 {
        return Err(OperationError::InvalidInput("push_up needs a 2D curve".into()).into());
    }
    let samples = samples.max(curve.control_point_count() * 2).max(8);
    let params = curve.uniform_parameters(samples);
    let points = params
        .iter()
        .map(|t| surface.point_at(&SurfacePoint::from_point3(&curve.point_at(*t))))
        .collect::<Result<Vec<Point3>>>()?;
    NurbsCurve::interpolate_with_parameters(3, curve.degree().max(3), &points, &params)
}

/// Length in 3D of the uv curve interpolating `points` on `surface`.
///
/// Returns `0.0` for fewer than two distinct points.
///
/// # Errors
///
/// Returns an error if evaluation or interpolation fails.
pub fn length_on_surface<S: Surface + ?Sized>(
    surface: &S,
    points: &[SurfacePoint],
    samples: usize,
) -> Result<f64> {
    let pts: Vec<Point3> = points.iter().map(|p| p.to_point3()).collect();
    let pts = crate::geometry::nurbs::dedup_points(&pts, 1e-14);
    if pts.len() < 2 {
        return Ok(0.0);
    }
    let uv = NurbsCurve::interpolate(2, 3, &pts)?;
    let samples = samples.max(pts.len() * 4);
    let domain = uv.domain();
    let mut total = 0.0;
    let mut prev = surface.point_at(&SurfacePoint::from_point3(&uv.point_at(domain.min)))?;
    for i in 1..=samples {
        let t = domain.parameter_at(to_f64(i) / to_f64(samples));
        let p = surface.point_at(&SurfacePoint::from_point3(&uv.point_at(t)))?;
        total += (p - prev).norm();
        prev = p;
    }
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{Cylinder, Plane, SurfaceDomain};
    use crate::math::{Interval, Vector3};
    use approx::assert_relative_eq;

    #[test]
    fn push_up_on_cylinder_follows_circle() {
        let cyl = Cylinder::new(
            Point3::origin(),
            2.0,
            Vector3::z(),
            Vector3::x(),
            Interval::new(0.0, 1.0),
        )
        .unwrap();
        let uv =
            NurbsCurve::line(2, Point3::new(0.0, 0.5, 0.0), Point3::new(3.0, 0.5, 0.0)).unwrap();
        let c3 = push_up(&uv, &cyl, 64).unwrap();
        for t in c3.uniform_parameters(20) {
            let p = c3.point_at(t);
            assert_relative_eq!(p.x.hypot(p.y), 2.0, epsilon = 1e-5);
        }
        assert_relative_eq!(c3.length(), 6.0, epsilon = 1e-4);
    }

    #[test]
    fn push_up_rejects_3d_curve() {
        let plane = Plane::new(
            Point3::origin(),
            Vector3::x(),
            Vector3::y(),
            SurfaceDomain::new(Interval::new(0.0, 1.0), Interval::new(0.0, 1.0)),
        )
        .unwrap();
        let c = NurbsCurve::line(3, Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(push_up(&c, &plane, 10).is_err());
    }

    #[test]
    fn length_on_plane_matches_uv_length() {
        let plane = Plane::new(
            Point3::origin(),
            Vector3::x(),
            Vector3::y(),
            SurfaceDomain::new(Interval::new(0.0, 10.0), Interval::new(0.0, 10.0)),
        )
        .unwrap();
        let pts = [
            SurfacePoint::new(0.0, 0.0),
            SurfacePoint::new(1.0, 0.0),
            SurfacePoint::new(2.0, 0.0),
        ];
        assert_relative_eq!(length_on_surface(&plane, &pts, 50).unwrap(), 2.0, epsilon = 1e-9);
    }
}
