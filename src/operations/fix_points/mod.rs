//! Surface-point correction.
//!
//! Projected trim points go wrong in predictable ways: they land on the far
//! side of a periodic seam, or pick an arbitrary value of the free axis next
//! to a pole. [`FixSurfacePoints`] repairs a point list in place and reverts
//! its own work when the result looks worse than the input.

mod seam;
mod singular;

use tracing::{debug, warn};

use crate::config::{HealConfig, PointFixParams, SeamParams, SingularBands};
use crate::error::Result;
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::{length_on_surface, Surface, SurfaceDomain, SurfacePoint};
use crate::operations::classify::{SurfaceSeams, SurfaceSingulars};

use singular::SingularPass;

/// Samples used when measuring point lists on the surface.
const GATE_SAMPLES: usize = 200;

/// Copy of a point list taken before the first correction.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionSnapshot {
    points: Vec<SurfacePoint>,
}

impl CorrectionSnapshot {
    /// Records `points` as they are now.
    #[must_use]
    pub fn begin(points: &[SurfacePoint]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    /// The recorded points.
    #[must_use]
    pub fn points(&self) -> &[SurfacePoint] {
        &self.points
    }

    /// Returns true if `points` differ from the recorded ones.
    #[must_use]
    pub fn differs_from(&self, points: &[SurfacePoint]) -> bool {
        self.points.as_slice() != points
    }

    /// Puts the recorded points back into `points`.
    pub fn restore(&self, points: &mut Vec<SurfacePoint>) {
        points.clone_from(&self.points);
    }
}

/// What [`FixSurfacePoints`] did to a point list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointFixReport {
    /// Whether the list differs from the input.
    pub changed: bool,
    /// Points moved across a seam, including rounded end points.
    pub seam_fixes: usize,
    /// Points moved near a singular side.
    pub singular_fixes: usize,
    /// Points clamped into the domain.
    pub clamped: usize,
    /// Consecutive duplicates dropped.
    pub duplicates_removed: usize,
    /// Whether the corrections were undone by the length check.
    pub reverted: bool,
    /// Corrected over original length on the surface, when it was measured.
    pub length_ratio: Option<f64>,
}

/// Corrects a sequence of `(u, v)` points meant to follow a curve on `surface`.
///
/// Passes run in order: duplicate removal, seam correction, singularity
/// correction, domain clamp. If seam or singularity corrections made the
/// on-surface length grow by more than `max_length_growth`, the list is
/// restored and only clamped.
pub struct FixSurfacePoints<'a> {
    surface: &'a dyn Surface,
    reference: Option<&'a NurbsCurve>,
    remove_duplicates: bool,
    round_first: bool,
    round_last: bool,
    params: PointFixParams,
    bands: SingularBands,
    seam_params: SeamParams,
}

impl<'a> FixSurfacePoints<'a> {
    /// Creates a new `FixSurfacePoints` operation with default parameters.
    #[must_use]
    pub fn new(surface: &'a dyn Surface) -> Self {
        Self {
            surface,
            reference: None,
            remove_duplicates: false,
            round_first: false,
            round_last: false,
            params: PointFixParams::default(),
            bands: SingularBands::default(),
            seam_params: SeamParams::default(),
        }
    }

    /// 3D curve the points were projected from, used near poles.
    #[must_use]
    pub fn with_reference_curve(mut self, curve: &'a NurbsCurve) -> Self {
        self.reference = Some(curve);
        self
    }

    #[must_use]
    pub fn remove_duplicates(mut self, enabled: bool) -> Self {
        self.remove_duplicates = enabled;
        self
    }

    /// Snap the first point onto the seam when it lies within the seam band.
    #[must_use]
    pub fn round_first(mut self, enabled: bool) -> Self {
        self.round_first = enabled;
        self
    }

    /// Snap the last point onto the seam when it lies within the seam band.
    #[must_use]
    pub fn round_last(mut self, enabled: bool) -> Self {
        self.round_last = enabled;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: PointFixParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_singular_bands(mut self, bands: SingularBands) -> Self {
        self.bands = bands;
        self
    }

    #[must_use]
    pub fn with_seam_params(mut self, params: SeamParams) -> Self {
        self.seam_params = params;
        self
    }

    /// Takes point, band and seam parameters from `config`.
    #[must_use]
    pub fn with_config(self, config: &HealConfig) -> Self {
        self.with_params(config.points)
            .with_singular_bands(config.singular)
            .with_seam_params(config.seam)
    }

    /// Corrects `points` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if surface evaluation fails.
    pub fn execute(&self, points: &mut Vec<SurfacePoint>) -> Result<PointFixReport> {
        let mut report = PointFixReport::default();
        if points.is_empty() {
            return Ok(report);
        }
        let snapshot = CorrectionSnapshot::begin(points);
        let domain = self.surface.domain();

        if self.remove_duplicates {
            report.duplicates_removed = dedup_consecutive(points, self.params.duplicate_tolerance);
        }

        let seams = SurfaceSeams::compute_with(self.surface, self.seam_params)?;
        if seams.has_any() {
            let band = self.params.seam_band;
            report.seam_fixes = seam::fix_seams(points, &seams, band, self.params.min_trusted_run);
            let n = points.len();
            if n >= 2 {
                if self.round_first && seam::round_end(points, 0, 1, &seams, band) {
                    report.seam_fixes += 1;
                }
                if self.round_last && seam::round_end(points, n - 1, n - 2, &seams, band) {
                    report.seam_fixes += 1;
                }
            }
        }

        let singulars = SurfaceSingulars::compute_with(self.surface, self.bands)?;
        if singulars.has_any() && points.len() > self.params.min_history {
            let pass = SingularPass {
                surface: self.surface,
                singulars: &singulars,
                reference: self.reference,
                params: &self.params,
            };
            report.singular_fixes = pass.run(points)?;
        }

        report.clamped = clamp_all(&domain, points);

        if report.seam_fixes + report.singular_fixes > 0 {
            let ratio = self.length_ratio(&domain, snapshot.points(), points);
            report.length_ratio = ratio;
            if ratio.is_none_or(|r| r > 1.0 + self.params.max_length_growth) {
                self.log_revert(ratio);
                snapshot.restore(points);
                report = PointFixReport {
                    clamped: clamp_all(&domain, points),
                    reverted: true,
                    length_ratio: ratio,
                    ..PointFixReport::default()
                };
            }
        }

        report.changed = snapshot.differs_from(points);
        Ok(report)
    }

    /// Corrected over original on-surface length.
    ///
    /// `None` means the corrected points could not be measured. An
    /// unmeasurable original passes the check.
    fn length_ratio(
        &self,
        domain: &SurfaceDomain,
        original: &[SurfacePoint],
        corrected: &[SurfacePoint],
    ) -> Option<f64> {
        let mut base_points = original.to_vec();
        clamp_all(domain, &mut base_points);
        let Ok(base) = length_on_surface(self.surface, &base_points, GATE_SAMPLES) else {
            return Some(1.0);
        };
        let fixed = length_on_surface(self.surface, corrected, GATE_SAMPLES).ok()?;
        Some(fixed / base.max(self.params.validation_tolerance))
    }

    fn log_revert(&self, ratio: Option<f64>) {
        match ratio {
            Some(r) if r > self.params.severe_ratio => {
                warn!(ratio = r, "point correction produced an extremely long curve, reverted");
            }
            Some(r) if r > self.params.warn_ratio => {
                warn!(ratio = r, "point correction produced a much longer curve, reverted");
            }
            Some(r) => debug!(ratio = r, "point correction lengthened the curve, reverted"),
            None => debug!("corrected points could not be measured, reverted"),
        }
    }
}

/// Drops consecutive points closer than `tol`, always keeping the last point.
fn dedup_consecutive(points: &mut Vec<SurfacePoint>, tol: f64) -> usize {
    let before = points.len();
    let mut out: Vec<SurfacePoint> = Vec::with_capacity(before);
    for (i, p) in points.iter().enumerate() {
        let kept = out.len();
        match out.last_mut() {
            Some(last) if last.distance(p) <= tol => {
                if i + 1 == before && kept > 1 {
                    *last = *p;
                }
            }
            _ => out.push(*p),
        }
    }
    *points = out;
    before - points.len()
}

fn clamp_all(domain: &SurfaceDomain, points: &mut [SurfacePoint]) -> usize {
    points.iter_mut().map(|p| domain.clamp(p)).filter(|moved| *moved).count()
}

/// Projects a 3D curve into the parameter space of `surface`.
///
/// Samples the curve at `samples + 1` uniform parameters, projects each
/// sample, corrects the projections against the curve and interpolates a 2D
/// cubic through them at the same parameters.
///
/// # Errors
///
/// Returns an error if evaluation or interpolation fails.
pub fn pull_back(surface: &dyn Surface, curve: &NurbsCurve, samples: usize) -> Result<NurbsCurve> {
    let params = curve.uniform_parameters(samples.max(8));
    let mut points = params
        .iter()
        .map(|t| surface.closest_point(&curve.point_at(*t)))
        .collect::<Result<Vec<_>>>()?;
    FixSurfacePoints::new(surface)
        .with_reference_curve(curve)
        .execute(&mut points)?;
    let uv: Vec<_> = points.iter().map(|p| p.to_point3()).collect();
    NurbsCurve::interpolate_with_parameters(2, 3, &uv, &params)
}
