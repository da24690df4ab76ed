use crate::config::SeamParams;
use crate::error::Result;
use crate::geometry::surface::{Surface, SurfaceDomain, SurfacePoint};
use crate::math::to_f64;

use super::singulars::edge_length;
use super::Side;

/// Per-axis seam classification of a surface.
#[derive(Debug, Clone)]
pub struct SurfaceSeams {
    domain: SurfaceDomain,
    seam: [bool; 2],
    params: SeamParams,
}

impl SurfaceSeams {
    /// Classifies the seams of `surface` with default parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if surface evaluation fails.
    pub fn compute<S: Surface + ?Sized>(surface: &S) -> Result<Self> {
        Self::compute_with(surface, SeamParams::default())
    }

    /// Classifies the seams of `surface`.
    ///
    /// An axis wraps when its low and high boundary edges coincide in 3D and
    /// are not collapsed to a point.
    ///
    /// # Errors
    ///
    /// Returns an error if surface evaluation fails.
    pub fn compute_with<S: Surface + ?Sized>(surface: &S, params: SeamParams) -> Result<Self> {
        let domain = surface.domain();
        let mut seam = [false; 2];
        for (axis, wraps) in seam.iter_mut().enumerate() {
            let low = Side::from_axis(axis, true);
            if edge_length(surface, &domain, low, params.edge_samples)? < params.coincidence {
                continue;
            }
            let range = domain.axis(axis);
            let across = domain.axis(1 - axis);
            let samples = params.edge_samples.max(2);
            let mut coincide = true;
            for i in 0..=samples {
                let mut a = SurfacePoint::default();
                a[axis] = range.min;
                a[1 - axis] = across.parameter_at(to_f64(i) / to_f64(samples));
                let mut b = a;
                b[axis] = range.max;
                if (surface.point_at(&a)? - surface.point_at(&b)?).norm() > params.coincidence {
                    coincide = false;
                    break;
                }
            }
            *wraps = coincide;
        }
        Ok(Self { domain, seam, params })
    }

    /// Returns true if the surface wraps along `axis`.
    #[must_use]
    pub fn has_seam(&self, axis: usize) -> bool {
        self.seam[axis.min(1)]
    }

    /// Returns true if any axis wraps.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.seam[0] || self.seam[1]
    }

    /// Seam tolerance along `axis`, in parameter units.
    #[must_use]
    pub fn tolerance(&self, axis: usize) -> f64 {
        self.params.on_seam * self.domain.axis(axis).length()
    }

    /// Returns true if `value` sits on the low bound of a wrapping `axis`.
    #[must_use]
    pub fn at_low_bound(&self, axis: usize, value: f64) -> bool {
        self.has_seam(axis) && (value - self.domain.axis(axis).min).abs() <= self.tolerance(axis)
    }

    /// Returns true if `value` sits on the high bound of a wrapping `axis`.
    #[must_use]
    pub fn at_high_bound(&self, axis: usize, value: f64) -> bool {
        self.has_seam(axis) && (value - self.domain.axis(axis).max).abs() <= self.tolerance(axis)
    }

    /// Returns true if `value` sits on the seam of `axis`.
    #[must_use]
    pub fn is_on_seam(&self, axis: usize, value: f64) -> bool {
        self.at_low_bound(axis, value) || self.at_high_bound(axis, value)
    }

    /// Parameter domain the classification was computed for.
    #[must_use]
    pub fn domain(&self) -> &SurfaceDomain {
        &self.domain
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{Cylinder, Plane, Sphere, Torus};
    use crate::math::{Interval, Point3, Vector3};
    use std::f64::consts::TAU;

    #[test]
    fn cylinder_wraps_in_u() {
        let c = Cylinder::new(
            Point3::origin(),
            1.0,
            Vector3::z(),
            Vector3::x(),
            Interval::new(0.0, 1.0),
        )
        .unwrap();
        let seams = SurfaceSeams::compute(&c).unwrap();
        assert!(seams.has_seam(0));
        assert!(!seams.has_seam(1));
        assert!(seams.is_on_seam(0, TAU));
        assert!(seams.at_low_bound(0, 1e-5));
        assert!(!seams.is_on_seam(0, 1.0));
    }

    #[test]
    fn torus_wraps_both_ways() {
        let t = Torus::new(Point3::origin(), 3.0, 1.0, Vector3::z(), Vector3::x()).unwrap();
        let seams = SurfaceSeams::compute(&t).unwrap();
        assert!(seams.has_seam(0) && seams.has_seam(1));
    }

    #[test]
    fn sphere_poles_are_not_seams() {
        let s = Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap();
        let seams = SurfaceSeams::compute(&s).unwrap();
        assert!(seams.has_seam(0));
        assert!(!seams.has_seam(1));
    }

    #[test]
    fn plane_has_no_seam() {
        let d = crate::geometry::surface::SurfaceDomain::new(
            Interval::new(0.0, 1.0),
            Interval::new(0.0, 1.0),
        );
        let p = Plane::new(Point3::origin(), Vector3::x(), Vector3::y(), d).unwrap();
        assert!(!SurfaceSeams::compute(&p).unwrap().has_any());
    }
}
