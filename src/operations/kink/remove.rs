use tracing::debug;

use crate::config::KinkParams;
use crate::error::{OperationError, Result};
use crate::geometry::curve::{CurveEnd, ExtendStyle};
use crate::geometry::nurbs::{chord_parameters, ArcLengthTable, NurbsCurve};
use crate::math::{to_f64, Point3};
use crate::operations::outcome::HealResult;
use crate::operations::zigzag::find_zigzag_indices;
use crate::tessellation::Polyline;

use super::{CurveKinkData, CurveKinkFind};

/// Repair strategies tried by [`CurveKinkRemove`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KinkStrategy {
    /// Cut the kink band and arc-extend back to the original end.
    SmoothInternal,
    /// Cut the kink band, extend with the best-fitting piece and blend.
    Smooth,
    /// Refit the samples outside the kink bands.
    Simple,
}

impl KinkStrategy {
    pub const ALL: [KinkStrategy; 3] = [
        KinkStrategy::SmoothInternal,
        KinkStrategy::Smooth,
        KinkStrategy::Simple,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            KinkStrategy::SmoothInternal => "smooth internal",
            KinkStrategy::Smooth => "smooth",
            KinkStrategy::Simple => "simple",
        }
    }
}

/// Removes end kinks from a curve.
///
/// Strategies run in [`KinkStrategy::ALL`] order and the first result that
/// stays within `max_deviation` outside the kink bands, has no kink and no
/// zig-zag is returned. Measurements are taken in the curve's own space.
pub struct CurveKinkRemove<'a> {
    curve: &'a NurbsCurve,
    kinks: Option<Vec<CurveKinkData>>,
    params: KinkParams,
}

impl<'a> CurveKinkRemove<'a> {
    /// Creates a new `CurveKinkRemove` operation that detects its own kinks.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve) -> Self {
        Self {
            curve,
            kinks: None,
            params: KinkParams::default(),
        }
    }

    /// Repairs these kinks instead of detecting them again.
    #[must_use]
    pub fn with_kinks(mut self, kinks: Vec<CurveKinkData>) -> Self {
        self.kinks = Some(kinks);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: KinkParams) -> Self {
        self.params = params;
        self
    }

    /// Runs the repair. Never fails; exhaustion is reported in the result.
    #[must_use]
    pub fn execute(&self) -> HealResult<NurbsCurve> {
        let kinks = match &self.kinks {
            Some(k) => k.clone(),
            None => CurveKinkFind::new(self.curve).with_params(self.params).execute(),
        };
        if kinks.is_empty() {
            return HealResult::unchanged(self.curve.clone());
        }

        let mut reasons = Vec::new();
        for strategy in KinkStrategy::ALL {
            let outcome = self
                .run(strategy, &kinks)
                .and_then(|candidate| self.validate(&candidate, &kinks).map(|d| (candidate, d)));
            match outcome {
                Ok((curve, deviation)) => {
                    return HealResult::fixed(curve, strategy.name(), Some(deviation))
                        .with_fail_reasons(reasons);
                }
                Err(e) => {
                    debug!(strategy = strategy.name(), error = %e, "kink strategy rejected");
                    reasons.push(format!("{}: {e}", strategy.name()));
                }
            }
        }
        debug!(reasons = %reasons.join("; "), "kink removal exhausted all strategies");
        HealResult::failed(self.curve.clone(), reasons)
    }

    pub(super) fn run(
        &self,
        strategy: KinkStrategy,
        kinks: &[CurveKinkData],
    ) -> Result<NurbsCurve> {
        match strategy {
            KinkStrategy::SmoothInternal => self.smooth_internal(kinks),
            KinkStrategy::Smooth => self.smooth(kinks),
            KinkStrategy::Simple => self.simple(kinks),
        }
    }

    /// Parameter range of the curve outside the kink bands.
    fn kept_range(&self, kinks: &[CurveKinkData]) -> (f64, f64) {
        let d = self.curve.domain();
        let mut range = (d.min, d.max);
        for k in kinks {
            match k.end {
                CurveEnd::Start => range.0 = k.t_band,
                CurveEnd::End => range.1 = k.t_band,
            }
        }
        range
    }

    fn trimmed(&self, kinks: &[CurveKinkData]) -> Result<NurbsCurve> {
        let (t0, t1) = self.kept_range(kinks);
        self.curve.trim(t0, t1)
    }

    fn smooth_internal(&self, kinks: &[CurveKinkData]) -> Result<NurbsCurve> {
        let mut curve = self.trimmed(kinks)?;
        for k in kinks {
            curve = curve.extend_to_point(k.end, self.curve.point_at_end(k.end), ExtendStyle::Arc)?;
        }
        Ok(curve)
    }

    fn smooth(&self, kinks: &[CurveKinkData]) -> Result<NurbsCurve> {
        let total = ArcLengthTable::new(self.curve, self.params.resample_count).total();
        let band_length = total * self.params.band;
        let mut curve = self.trimmed(kinks)?;
        for k in kinks {
            curve = best_extension(&curve, k.end, self.curve.point_at_end(k.end), band_length);
        }

        // Spread the remaining miss at each end linearly over the band.
        let params = curve.divide_by_count(self.params.resample_count);
        let last = params.len() - 1;
        let mut points: Vec<Point3> = params.iter().map(|t| curve.point_at(*t)).collect();
        for k in kinks {
            let miss = self.curve.point_at_end(k.end) - curve.point_at_end(k.end);
            for (i, p) in points.iter_mut().enumerate() {
                let s = to_f64(i) / to_f64(last);
                let from_end = match k.end {
                    CurveEnd::Start => s,
                    CurveEnd::End => 1.0 - s,
                };
                let w = 1.0 - from_end / self.params.band;
                if w > 0.0 {
                    *p += miss * w;
                }
            }
        }
        self.refit(&points)
    }

    fn simple(&self, kinks: &[CurveKinkData]) -> Result<NurbsCurve> {
        let (t0, t1) = self.kept_range(kinks);
        let params = self.curve.divide_by_count(self.params.resample_count);
        let last = params.len() - 1;
        let points: Vec<Point3> = params
            .iter()
            .enumerate()
            .filter(|(i, t)| *i == 0 || *i == last || (**t >= t0 && **t <= t1))
            .map(|(_, t)| self.curve.point_at(*t))
            .collect();
        self.refit(&points)
    }

    /// Least-squares cubic through `points` over the original domain, with
    /// the original end points.
    fn refit(&self, points: &[Point3]) -> Result<NurbsCurve> {
        let domain = self.curve.domain();
        let params: Vec<f64> = chord_parameters(points)
            .into_iter()
            .map(|f| domain.parameter_at(f))
            .collect();
        let count = self
            .curve
            .control_point_count()
            .max(8)
            .min(points.len().saturating_sub(1));
        let mut curve = NurbsCurve::fit(self.curve.dimension(), 3, points, &params, count)?;
        let last = curve.control_point_count() - 1;
        curve.set_control_point(0, self.curve.start_point());
        curve.set_control_point(last, self.curve.end_point());
        Ok(curve)
    }

    /// Deviation outside the kink bands, if the candidate is acceptable.
    fn validate(&self, candidate: &NurbsCurve, kinks: &[CurveKinkData]) -> Result<f64> {
        let (t0, t1) = self.kept_range(kinks);
        let dense = candidate.uniform_parameters(self.params.validation_samples * 4);
        let polyline = Polyline {
            points: dense.iter().map(|t| candidate.point_at(*t)).collect(),
            params: dense,
        };
        let n = self.params.validation_samples.max(1);
        let deviation = (0..=n)
            .map(|i| self.curve.point_at(t0 + (t1 - t0) * to_f64(i) / to_f64(n)))
            .map(|p| polyline.distance_to(&p))
            .fold(0.0, f64::max);
        if deviation > self.params.max_deviation {
            return Err(OperationError::Failed(format!(
                "deviates {deviation:.4} outside the kink bands, limit {}",
                self.params.max_deviation
            ))
            .into());
        }
        if !CurveKinkFind::new(candidate).with_params(self.params).execute().is_empty() {
            return Err(OperationError::Failed("result is still kinked".into()).into());
        }
        if candidate.degree() > 2 && find_zigzag_indices(candidate.control_points()).is_some() {
            return Err(OperationError::Failed("result has zig-zags".into()).into());
        }
        Ok(deviation)
    }
}

/// The extension of `curve` at `end` finishing closest to `target`.
///
/// Candidates: the curve as is, line and arc extensions by `length`, and
/// line and arc extensions by twice that length cut back at `target`.
/// Pieces that cannot be built are skipped.
fn best_extension(curve: &NurbsCurve, end: CurveEnd, target: Point3, length: f64) -> NurbsCurve {
    let mut options = vec![curve.clone()];
    if length > 0.0 {
        for style in [ExtendStyle::Line, ExtendStyle::Arc] {
            if let Ok(e) = curve.extend_by_length(end, length, style) {
                options.push(e);
            }
            if let Ok(long) = curve.extend_by_length(end, 2.0 * length, style) {
                let t = long.closest_point(&target);
                let d = long.domain();
                let cut = match end {
                    CurveEnd::Start if t < curve.domain().min => long.trim(t, d.max),
                    CurveEnd::End if t > curve.domain().max => long.trim(d.min, t),
                    _ => continue,
                };
                if let Ok(c) = cut {
                    options.push(c);
                }
            }
        }
    }
    options
        .into_iter()
        .map(|c| ((c.point_at_end(end) - target).norm(), c))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map_or_else(|| curve.clone(), |(_, c)| c)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_curves::{kinked_at_end, smooth_bend};
    use super::*;

    #[test]
    fn kink_free_curve_is_unchanged() {
        let c = smooth_bend();
        let r = CurveKinkRemove::new(&c).execute();
        assert!(!r.changed);
        assert_eq!(r.value, c);
    }

    #[test]
    fn hooked_end_is_repaired() {
        let c = kinked_at_end(20.0);
        let r = CurveKinkRemove::new(&c).execute();
        assert!(r.changed, "{:?}", r.fail_reason());
        assert!(CurveKinkFind::new(&r.value).execute().is_empty());
        assert!(r.deviation.unwrap() <= 0.1);
        assert!((r.value.end_point() - c.end_point()).norm() < 1e-6);
        assert!((r.value.start_point() - c.start_point()).norm() < 1e-6);
    }

    #[test]
    fn smooth_internal_is_tried_first() {
        let c = kinked_at_end(20.0);
        let r = CurveKinkRemove::new(&c).execute();
        assert_eq!(r.applied, Some(KinkStrategy::SmoothInternal.name()));
    }

    #[test]
    fn every_strategy_keeps_end_points() {
        let c = kinked_at_end(20.0);
        let op = CurveKinkRemove::new(&c);
        let kinks = CurveKinkFind::new(&c).execute();
        for strategy in KinkStrategy::ALL {
            let out = op.run(strategy, &kinks).unwrap();
            assert!((out.end_point() - c.end_point()).norm() < 1e-6, "{}", strategy.name());
            assert!((out.start_point() - c.start_point()).norm() < 1e-6, "{}", strategy.name());
        }
    }

    #[test]
    fn impossible_limit_reports_all_strategies() {
        let c = kinked_at_end(20.0);
        let params = KinkParams {
            max_deviation: -1.0,
            ..KinkParams::default()
        };
        let r = CurveKinkRemove::new(&c).with_params(params).execute();
        assert!(!r.changed);
        assert_eq!(r.fail_reasons.len(), 3);
        assert_eq!(r.value, c);
    }
}
