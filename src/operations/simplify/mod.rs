//! Control-point reduction and increase under a deviation bound.

mod complexify;
mod deviation;

pub use complexify::ComplexifyCurve;
pub use deviation::CurveDeviation;

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{HealConfig, SimplifyParams, SingularBands};
use crate::error::{OperationError, Result};
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::{push_up, Surface, SurfacePoint};
use crate::math::{Point3, TOLERANCE};
use crate::operations::classify::{SingularBand, SurfaceSingulars};
use crate::operations::fix_points::FixSurfacePoints;
use crate::operations::outcome::HealResult;
use crate::operations::zigzag::ZigZagFind;
use crate::tessellation::{Polyline, TessellateCurve, TessellationParams};

/// One control-point count tried by [`SimplifyCurve`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyAttempt {
    pub count: usize,
    /// Measured deviation, if the candidate got that far.
    pub deviation: Option<f64>,
    pub accepted: bool,
    /// Why the candidate was rejected.
    pub reason: Option<String>,
}

/// Result of [`SimplifyCurve::execute`] with per-call diagnostics.
#[derive(Debug, Clone)]
pub struct SimplifyOutcome {
    pub result: HealResult<NurbsCurve>,
    pub attempts: Vec<SimplifyAttempt>,
    pub elapsed: Duration,
}

enum Verdict {
    Accepted(NurbsCurve, f64),
    Rejected(String, Option<f64>),
}

/// Reduces the control-point count of a cubic curve.
///
/// Candidate counts come from an ascending ladder capped at half the
/// original count; the first candidate within the deviation bound wins.
/// Count 2 stands for a straight line. For 2D curves every measurement is
/// done in 3D through the surface.
pub struct SimplifyCurve<'a> {
    curve: &'a NurbsCurve,
    surface: Option<&'a dyn Surface>,
    allow_singular: bool,
    params: SimplifyParams,
    bands: SingularBands,
}

impl<'a> SimplifyCurve<'a> {
    /// Creates a new `SimplifyCurve` operation with default parameters.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve) -> Self {
        Self {
            curve,
            surface: None,
            allow_singular: false,
            params: SimplifyParams::default(),
            bands: SingularBands::default(),
        }
    }

    /// Surface the curve lies on. Required for 2D curves.
    #[must_use]
    pub fn with_surface(mut self, surface: &'a dyn Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Whether curves on surfaces with poles may be simplified at all.
    #[must_use]
    pub fn allow_singular_surfaces(mut self, allow: bool) -> Self {
        self.allow_singular = allow;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: SimplifyParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_singular_bands(mut self, bands: SingularBands) -> Self {
        self.bands = bands;
        self
    }

    #[must_use]
    pub fn with_config(self, config: &HealConfig) -> Self {
        self.with_params(config.simplify.clone()).with_singular_bands(config.singular)
    }

    /// Runs the simplification.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] for a 2D curve without a
    /// surface, or an error if evaluating the original curve fails.
    pub fn execute(&self) -> Result<SimplifyOutcome> {
        let started = Instant::now();
        let finish = |result, attempts| SimplifyOutcome {
            result,
            attempts,
            elapsed: started.elapsed(),
        };
        let unchanged = || HealResult::unchanged(self.curve.clone());

        let dim = self.curve.dimension();
        if dim == 2 && self.surface.is_none() {
            return Err(OperationError::InvalidInput(
                "simplifying a 2D curve needs its surface".into(),
            )
            .into());
        }
        if self.curve.degree() != 3 {
            return Ok(finish(unchanged(), Vec::new()));
        }
        let singulars = self
            .surface
            .map(|s| SurfaceSingulars::compute_with(s, self.bands))
            .transpose()?;
        if singulars.as_ref().is_some_and(SurfaceSingulars::has_any) && !self.allow_singular {
            debug!("surface has singular sides, simplification skipped");
            return Ok(finish(unchanged(), Vec::new()));
        }

        let original = self.sample(self.curve, None)?;
        let original_length = original.length();
        if original_length < TOLERANCE {
            return Ok(finish(unchanged(), Vec::new()));
        }
        let segments = original.points.len() - 1;
        let near_singular = dim == 2
            && singulars
                .as_ref()
                .is_some_and(|s| self.passes_near_pole(s, &original));
        let tol = if near_singular {
            self.params.singular_max_deviation
        } else {
            self.params.max_deviation
        };

        let mut ladder = self.params.ladder.clone();
        ladder.sort_unstable();
        ladder.dedup();
        let max_count = self.curve.control_point_count() / 2;

        let mut attempts = Vec::new();
        for count in ladder.into_iter().filter(|c| *c >= 2 && *c <= max_count) {
            let verdict = match self.candidate(count, segments) {
                Ok(Some(candidate)) => {
                    self.judge(candidate, &original, segments, tol, near_singular)?
                }
                Ok(None) => Verdict::Rejected(
                    "straight line needs a surface with a linear axis".into(),
                    None,
                ),
                Err(e) => Verdict::Rejected(e.to_string(), None),
            };
            match verdict {
                Verdict::Accepted(curve, deviation) => {
                    attempts.push(SimplifyAttempt {
                        count,
                        deviation: Some(deviation),
                        accepted: true,
                        reason: None,
                    });
                    let result = HealResult::fixed(curve, "rebuild", Some(deviation));
                    return Ok(finish(result, attempts));
                }
                Verdict::Rejected(reason, deviation) => {
                    debug!(count, %reason, "simplification candidate rejected");
                    attempts.push(SimplifyAttempt {
                        count,
                        deviation,
                        accepted: false,
                        reason: Some(reason),
                    });
                }
            }
        }

        let reasons = attempts
            .iter()
            .filter_map(|a| a.reason.as_ref().map(|r| format!("{} control points: {r}", a.count)))
            .collect();
        Ok(finish(HealResult::failed(self.curve.clone(), reasons), attempts))
    }

    fn sample(&self, curve: &NurbsCurve, segments: Option<usize>) -> Result<Polyline> {
        let params = TessellationParams {
            min_segments: self.params.min_segments,
            max_segments: self.params.max_segments,
            segments_per_unit: self.params.segments_per_unit,
        };
        let op = TessellateCurve::new(curve, params).on_optional_surface(self.surface);
        match segments {
            Some(n) => op.with_segments(n).execute(),
            None => op.execute(),
        }
    }

    fn passes_near_pole(&self, singulars: &SurfaceSingulars, original: &Polyline) -> bool {
        original.params.iter().any(|t| {
            let uv = SurfacePoint::from_point3(&self.curve.point_at(*t));
            singulars.near_singular_side(&uv, SingularBand::HighJump).is_some()
        })
    }

    fn line_allowed(&self) -> bool {
        match self.surface {
            Some(s) => s.is_linear(0) || s.is_linear(1),
            None => self.curve.dimension() == 3,
        }
    }

    /// Candidate with `count` control points, or `None` when a line is not allowed.
    fn candidate(&self, count: usize, segments: usize) -> Result<Option<NurbsCurve>> {
        let dim = self.curve.dimension();
        if count == 2 {
            if !self.line_allowed() {
                return Ok(None);
            }
            let line = NurbsCurve::line(dim, self.curve.start_point(), self.curve.end_point())?;
            return Ok(Some(line.with_domain(self.curve.domain())));
        }

        let mut rebuilt = self.curve.rebuild(count, 3)?;
        if let (2, Some(surface)) = (dim, self.surface) {
            if ZigZagFind::new(&rebuilt).with_surface(surface).execute()?.is_some() {
                rebuilt = self.rebuild_through_3d(surface, count, segments)?;
                if ZigZagFind::new(&rebuilt).with_surface(surface).execute()?.is_some() {
                    return Err(OperationError::Failed(
                        "rebuilt curve zig-zags even when rebuilt in 3D".into(),
                    )
                    .into());
                }
            }
        }
        let last = rebuilt.control_point_count() - 1;
        rebuilt.set_control_point(0, self.curve.start_point());
        rebuilt.set_control_point(last, self.curve.end_point());
        Ok(Some(rebuilt))
    }

    /// Rebuilds the 3D image of a 2D curve and projects its control points back.
    fn rebuild_through_3d(
        &self,
        surface: &dyn Surface,
        count: usize,
        segments: usize,
    ) -> Result<NurbsCurve> {
        let curve3d = push_up(self.curve, surface, segments)?;
        let rebuilt3d = curve3d.rebuild(count, 3)?;
        let mut uv = rebuilt3d
            .control_points()
            .iter()
            .map(|p| surface.closest_point(p))
            .collect::<Result<Vec<_>>>()?;
        FixSurfacePoints::new(surface)
            .with_reference_curve(&rebuilt3d)
            .execute(&mut uv)?;
        let points: Vec<Point3> = uv.iter().map(|p| p.to_point3()).collect();
        NurbsCurve::try_new(
            2,
            rebuilt3d.degree(),
            points,
            Some(rebuilt3d.weights().to_vec()),
            rebuilt3d.knots().to_vec(),
        )
    }

    fn judge(
        &self,
        candidate: NurbsCurve,
        original: &Polyline,
        segments: usize,
        tol: f64,
        near_singular: bool,
    ) -> Result<Verdict> {
        if near_singular {
            if let Some(surface) = self.surface {
                for (i, p) in candidate.control_points().iter().enumerate() {
                    let d = original.distance_to(&surface.point_at(&SurfacePoint::from_point3(p))?);
                    if d > tol {
                        return Ok(Verdict::Rejected(
                            format!(
                                "control point {i} is {d:.2e} from the original near a singularity"
                            ),
                            None,
                        ));
                    }
                }
            }
        }

        // Samples at equal domain fractions, so a candidate that follows the
        // path but not the speed of the original is rejected.
        let poly = self.sample(&candidate, Some(segments))?;
        let deviation = original.max_pairwise_distance(&poly);
        if deviation > tol {
            return Ok(Verdict::Rejected(
                format!("deviation {deviation:.2e} exceeds {tol:.2e}"),
                Some(deviation),
            ));
        }
        if self.curve.dimension() == 3 {
            let original_length = original.length();
            let growth = (poly.length() - original_length).abs() / original_length;
            if growth > self.params.length_tolerance {
                return Ok(Verdict::Rejected(
                    format!("length differs by {:.3}%", growth * 100.0),
                    Some(deviation),
                ));
            }
        }
        Ok(Verdict::Accepted(candidate, deviation))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::{Cylinder, Plane, Sphere, SurfaceDomain};
    use crate::math::{to_f64, Interval, Vector3};
    use approx::assert_relative_eq;

    /// Cubic through `count` points on the segment `a..b`, evaluated at
    /// equal parameter steps so its speed is constant.
    fn straight(dimension: usize, a: Point3, b: Point3, count: usize) -> NurbsCurve {
        let params: Vec<f64> = (0..count).map(|i| to_f64(i) / to_f64(count - 1)).collect();
        let pts: Vec<Point3> = params
            .iter()
            .map(|f| a + (b - a) * *f + Vector3::new(0.0, 1e-6 * (f * 7.0).sin(), 0.0))
            .collect();
        NurbsCurve::interpolate_with_parameters(dimension, 3, &pts, &params).unwrap()
    }

    fn wavy(count: usize) -> NurbsCurve {
        let pts: Vec<Point3> = (0..count)
            .map(|i| {
                let x = 4.0 * to_f64(i) / to_f64(count - 1);
                Point3::new(x, 0.3 * x.sin(), 0.0)
            })
            .collect();
        NurbsCurve::interpolate(3, 3, &pts).unwrap()
    }

    #[test]
    fn nearly_straight_3d_curve_becomes_line() {
        let c = straight(3, Point3::origin(), Point3::new(1.0, 0.0, 0.0), 50);
        let out = SimplifyCurve::new(&c).execute().unwrap();
        assert!(out.result.changed);
        assert_eq!(out.result.value.control_point_count(), 2);
        assert_eq!(out.attempts.len(), 1);
        let dev = CurveDeviation::new(&c, &out.result.value).corresponding().unwrap();
        assert!(dev <= 0.001, "{dev}");
    }

    #[test]
    fn unevenly_parameterized_line_is_not_collapsed() {
        let pts: Vec<Point3> = (0..50)
            .map(|i| {
                let f = to_f64(i) / 49.0;
                Point3::new(f * f, 0.0, 0.0)
            })
            .collect();
        let c = NurbsCurve::from_control_points(3, 3, &pts).unwrap();
        let out = SimplifyCurve::new(&c).execute().unwrap();

        let line = &out.attempts[0];
        assert_eq!(line.count, 2);
        assert!(!line.accepted);
        assert!(line.deviation.unwrap() > 0.001);
        if out.result.changed {
            assert!(out.result.value.control_point_count() > 2);
            let dev = CurveDeviation::new(&c, &out.result.value).corresponding().unwrap();
            assert!(dev <= 0.001, "{dev}");
        } else {
            assert_eq!(out.result.value, c);
        }
    }

    #[test]
    fn wavy_curve_uses_smallest_passing_count() {
        let c = wavy(60);
        let out = SimplifyCurve::new(&c).execute().unwrap();
        assert!(out.result.changed);
        let n = out.result.value.control_point_count();
        assert!(n > 2 && n < c.control_point_count());
        let dev = CurveDeviation::new(&c, &out.result.value)
            .with_segments(200)
            .corresponding()
            .unwrap();
        assert!(dev <= 0.001 + 1e-9);
        assert!(out.attempts.last().unwrap().accepted);
        assert!(out.attempts[..out.attempts.len() - 1].iter().all(|a| !a.accepted));
    }

    #[test]
    fn non_cubic_curve_is_unchanged() {
        let pts: Vec<Point3> = (0..20).map(|i| Point3::new(to_f64(i), 0.0, 0.0)).collect();
        let c = NurbsCurve::from_control_points(3, 2, &pts).unwrap();
        let out = SimplifyCurve::new(&c).execute().unwrap();
        assert!(!out.result.changed);
        assert_eq!(out.result.value, c);
        assert!(out.attempts.is_empty());
    }

    #[test]
    fn planar_2d_line_on_plane() {
        let plane = Plane::new(
            Point3::origin(),
            Vector3::x(),
            Vector3::y(),
            SurfaceDomain::new(Interval::new(0.0, 2.0), Interval::new(0.0, 2.0)),
        )
        .unwrap();
        let c = straight(2, Point3::new(0.1, 0.5, 0.0), Point3::new(1.1, 0.5, 0.0), 50);
        let out = SimplifyCurve::new(&c).with_surface(&plane).execute().unwrap();
        assert_eq!(out.result.value.control_point_count(), 2);
        assert_eq!(out.result.value.dimension(), 2);
    }

    #[test]
    fn cylinder_has_linear_axis() {
        let cyl = Cylinder::new(
            Point3::origin(),
            1.0,
            Vector3::z(),
            Vector3::x(),
            Interval::new(0.0, 1.0),
        )
        .unwrap();
        let c = straight(2, Point3::new(1.0, 0.1, 0.0), Point3::new(1.0, 0.9, 0.0), 40);
        let out = SimplifyCurve::new(&c).with_surface(&cyl).execute().unwrap();
        assert_eq!(out.result.value.control_point_count(), 2);
    }

    #[test]
    fn line_not_tried_on_sphere() {
        let sphere = Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap();
        let pts: Vec<Point3> = (0..40)
            .map(|i| Point3::new(0.5 + to_f64(i) / 39.0, 0.2, 0.0))
            .collect();
        let c = NurbsCurve::from_control_points(2, 3, &pts).unwrap();
        let out = SimplifyCurve::new(&c)
            .with_surface(&sphere)
            .allow_singular_surfaces(true)
            .execute()
            .unwrap();
        assert!(out.result.value.control_point_count() > 2);
        assert!(!out.attempts[0].accepted);
    }

    #[test]
    fn singular_surface_skipped_unless_allowed() {
        let sphere = Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap();
        let pts: Vec<Point3> = (0..40)
            .map(|i| Point3::new(0.5 + to_f64(i) / 39.0, 0.2, 0.0))
            .collect();
        let c = NurbsCurve::from_control_points(2, 3, &pts).unwrap();
        let out = SimplifyCurve::new(&c).with_surface(&sphere).execute().unwrap();
        assert!(!out.result.changed);
    }

    #[test]
    fn two_dimensional_without_surface_is_error() {
        let pts: Vec<Point3> = (0..10).map(|i| Point3::new(to_f64(i), 0.0, 0.0)).collect();
        let c = NurbsCurve::from_control_points(2, 3, &pts).unwrap();
        assert!(SimplifyCurve::new(&c).execute().is_err());
    }

    #[test]
    fn end_points_are_exact() {
        let c = wavy(60);
        let out = SimplifyCurve::new(&c).execute().unwrap();
        assert_relative_eq!((out.result.value.start_point() - c.start_point()).norm(), 0.0);
        assert_relative_eq!((out.result.value.end_point() - c.end_point()).norm(), 0.0);
    }
}
