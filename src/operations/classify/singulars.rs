use crate::config::SingularBands;
use crate::error::Result;
use crate::geometry::surface::{Surface, SurfaceDomain, SurfacePoint};
use crate::math::{to_f64, Point3};

use super::Side;

/// Tolerance band around a singular side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularBand {
    /// Close to the pole.
    Close,
    /// Practically on the pole.
    Almost,
    /// Wide band catching gross mis-projections.
    HighJump,
    /// Twice the high-jump band.
    HighJumpDouble,
    /// Four times the high-jump band.
    HighJumpQuad,
}

/// Which sides of a surface collapse to a point, with the tolerance bands
/// used near them.
#[derive(Debug, Clone)]
pub struct SurfaceSingulars {
    domain: SurfaceDomain,
    singular: [bool; 4],
    bands: SingularBands,
}

impl SurfaceSingulars {
    /// Classifies the sides of `surface` with default bands.
    ///
    /// # Errors
    ///
    /// Returns an error if surface evaluation fails.
    pub fn compute<S: Surface + ?Sized>(surface: &S) -> Result<Self> {
        Self::compute_with(surface, SingularBands::default())
    }

    /// Classifies the sides of `surface`.
    ///
    /// A side is singular when the 3D image of its boundary edge is shorter
    /// than `bands.edge_tolerance`.
    ///
    /// # Errors
    ///
    /// Returns an error if surface evaluation fails.
    pub fn compute_with<S: Surface + ?Sized>(surface: &S, bands: SingularBands) -> Result<Self> {
        let domain = surface.domain();
        let mut singular = [false; 4];
        for (k, side) in Side::ALL.iter().enumerate() {
            let length = edge_length(surface, &domain, *side, bands.edge_samples)?;
            singular[k] = length < bands.edge_tolerance;
        }
        Ok(Self {
            domain,
            singular,
            bands,
        })
    }

    /// Returns true if `side` collapses to a point.
    #[must_use]
    pub fn is_singular(&self, side: Side) -> bool {
        self.singular[side_index(side)]
    }

    /// Returns true if any side is singular.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.singular.iter().any(|s| *s)
    }

    /// The singular sides.
    #[must_use]
    pub fn singular_sides(&self) -> Vec<Side> {
        Side::ALL.into_iter().filter(|s| self.is_singular(*s)).collect()
    }

    /// Band width, in parameter units, along `axis`.
    #[must_use]
    pub fn band(&self, axis: usize, band: SingularBand) -> f64 {
        let fraction = match band {
            SingularBand::Close => self.bands.close,
            SingularBand::Almost => self.bands.almost,
            SingularBand::HighJump => self.bands.high_jump,
            SingularBand::HighJumpDouble => self.bands.high_jump_double,
            SingularBand::HighJumpQuad => self.bands.high_jump_quad,
        };
        fraction * self.domain.axis(axis).length()
    }

    /// Returns true if `point` lies within `band` of the singular `side`.
    #[must_use]
    pub fn is_near(&self, side: Side, point: &SurfacePoint, band: SingularBand) -> bool {
        self.is_singular(side)
            && (point[side.axis()] - side.bound(&self.domain)).abs() <= self.band(side.axis(), band)
    }

    /// The nearest singular side within `band` of `point`, if any.
    #[must_use]
    pub fn near_singular_side(&self, point: &SurfacePoint, band: SingularBand) -> Option<Side> {
        self.singular_sides()
            .into_iter()
            .filter(|s| self.is_near(*s, point, band))
            .min_by(|a, b| {
                let da = (point[a.axis()] - a.bound(&self.domain)).abs();
                let db = (point[b.axis()] - b.bound(&self.domain)).abs();
                da.total_cmp(&db)
            })
    }

    /// Parameter domain the classification was computed for.
    #[must_use]
    pub fn domain(&self) -> &SurfaceDomain {
        &self.domain
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::West => 0,
        Side::East => 1,
        Side::South => 2,
        Side::North => 3,
    }
}

/// 3D polyline length of the boundary edge along `side`.
pub(super) fn edge_length<S: Surface + ?Sized>(
    surface: &S,
    domain: &SurfaceDomain,
    side: Side,
    samples: usize,
) -> Result<f64> {
    let along = domain.axis(1 - side.axis());
    let fixed = side.bound(domain);
    let samples = samples.max(2);
    let mut total = 0.0;
    let mut prev: Option<Point3> = None;
    for i in 0..=samples {
        let t = along.parameter_at(to_f64(i) / to_f64(samples));
        let mut uv = SurfacePoint::default();
        uv[side.axis()] = fixed;
        uv[1 - side.axis()] = t;
        let p = surface.point_at(&uv)?;
        if let Some(q) = prev {
            total += (p - q).norm();
        }
        prev = Some(p);
    }
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{Cone, Cylinder, Sphere};
    use crate::math::{Interval, Point3, Vector3};

    #[test]
    fn sphere_has_two_poles() {
        let s = Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap();
        let sing = SurfaceSingulars::compute(&s).unwrap();
        assert_eq!(sing.singular_sides(), vec![Side::South, Side::North]);
    }

    #[test]
    fn cone_apex_is_south() {
        let c = Cone::new(Point3::origin(), Vector3::z(), 0.5, Vector3::x(), 2.0).unwrap();
        let sing = SurfaceSingulars::compute(&c).unwrap();
        assert_eq!(sing.singular_sides(), vec![Side::South]);
    }

    #[test]
    fn cylinder_has_none() {
        let c = Cylinder::new(
            Point3::origin(),
            1.0,
            Vector3::z(),
            Vector3::x(),
            Interval::new(0.0, 1.0),
        )
        .unwrap();
        assert!(!SurfaceSingulars::compute(&c).unwrap().has_any());
    }

    #[test]
    fn bands_scale_with_domain() {
        let s = Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap();
        let sing = SurfaceSingulars::compute(&s).unwrap();
        let pi = std::f64::consts::PI;
        assert!((sing.band(1, SingularBand::Close) - 0.01 * pi).abs() < 1e-12);
        assert!((sing.band(1, SingularBand::HighJumpQuad) - 0.24 * pi).abs() < 1e-12);
    }

    #[test]
    fn near_side_detection() {
        let s = Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap();
        let sing = SurfaceSingulars::compute(&s).unwrap();
        let half = std::f64::consts::FRAC_PI_2;
        let near_north = SurfacePoint::new(1.0, half - 0.001);
        assert_eq!(sing.near_singular_side(&near_north, SingularBand::Close), Some(Side::North));
        assert_eq!(sing.near_singular_side(&near_north, SingularBand::Almost), Some(Side::North));
        let equator = SurfacePoint::new(1.0, 0.0);
        assert_eq!(sing.near_singular_side(&equator, SingularBand::HighJumpQuad), None);
    }
}
