use tracing::debug;

use crate::config::ZigZagParams;
use crate::error::{OperationError, Result};
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::Surface;
use crate::math::{to_f64, Point3, TOLERANCE};
use crate::operations::outcome::HealResult;
use crate::operations::simplify::{CurveDeviation, SimplifyCurve};
use crate::tessellation::{TessellateCurve, TessellationParams};

use super::{control_points_3d, group_with_gap, ZigZagDiapason, ZigZagFind};

/// Repair strategies tried by [`ZigZagRemove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZigZagStrategy {
    /// Drop samples around each diapason and refit the rest.
    RemoveDiapasons,
    /// Reorder the control points inside each diapason.
    SortControlPoints,
    /// Reorder a dense sampling of the whole curve. 3D curves only.
    SortSamplePoints,
}

impl ZigZagStrategy {
    pub const ALL: [ZigZagStrategy; 3] = [
        ZigZagStrategy::RemoveDiapasons,
        ZigZagStrategy::SortControlPoints,
        ZigZagStrategy::SortSamplePoints,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ZigZagStrategy::RemoveDiapasons => "remove diapasons",
            ZigZagStrategy::SortControlPoints => "sort control points",
            ZigZagStrategy::SortSamplePoints => "sort sample points",
        }
    }
}

/// Removes zig-zags from a curve.
///
/// Every applicable strategy is run; among those that leave no zig-zag the
/// smoothest result wins.
pub struct ZigZagRemove<'a> {
    curve: &'a NurbsCurve,
    surface: Option<&'a dyn Surface>,
    params: ZigZagParams,
}

impl<'a> ZigZagRemove<'a> {
    /// Creates a new `ZigZagRemove` operation.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve) -> Self {
        Self {
            curve,
            surface: None,
            params: ZigZagParams::default(),
        }
    }

    /// Surface a 2D curve lives on.
    #[must_use]
    pub fn with_surface(mut self, surface: &'a dyn Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ZigZagParams) -> Self {
        self.params = params;
        self
    }

    /// Runs the repair.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] for a 2D curve without a
    /// surface, or an error if surface evaluation fails while scoring.
    pub fn execute(&self) -> Result<HealResult<NurbsCurve>> {
        let Some(indices) = self.find(self.curve)? else {
            return Ok(HealResult::unchanged(self.curve.clone()));
        };
        let diapasons = group_with_gap(self.curve, &indices, self.params.merge_gap);

        let mut reasons = Vec::new();
        let mut best: Option<(ZigZagStrategy, NurbsCurve, f64)> = None;
        for strategy in ZigZagStrategy::ALL {
            if strategy == ZigZagStrategy::SortSamplePoints && self.curve.dimension() != 3 {
                continue;
            }
            let candidate = match self.run(strategy, &diapasons) {
                Ok(c) => c,
                Err(e) => {
                    debug!(strategy = strategy.name(), error = %e, "zig-zag strategy failed");
                    reasons.push(format!("{}: {e}", strategy.name()));
                    continue;
                }
            };
            let score = self.smoothness(&candidate)?;
            if best.as_ref().is_none_or(|(_, _, s)| score < *s) {
                best = Some((strategy, candidate, score));
            }
        }

        let Some((strategy, curve, _)) = best else {
            debug!(reasons = %reasons.join("; "), "zig-zag removal exhausted all strategies");
            return Ok(HealResult::failed(self.curve.clone(), reasons));
        };
        let deviation = CurveDeviation::new(self.curve, &curve)
            .on_optional_surface(self.surface)
            .two_sided()?;
        Ok(HealResult::fixed(curve, strategy.name(), Some(deviation)).with_fail_reasons(reasons))
    }

    fn find(&self, curve: &NurbsCurve) -> Result<Option<Vec<usize>>> {
        let mut op = ZigZagFind::new(curve);
        if let Some(s) = self.surface {
            op = op.with_surface(s);
        }
        op.execute()
    }

    fn run(&self, strategy: ZigZagStrategy, diapasons: &[ZigZagDiapason]) -> Result<NurbsCurve> {
        let candidate = match strategy {
            ZigZagStrategy::RemoveDiapasons => return self.remove_diapasons(diapasons),
            ZigZagStrategy::SortControlPoints => self.sort_control_points(diapasons)?,
            ZigZagStrategy::SortSamplePoints => self.sort_sample_points()?,
        };
        if self.find(&candidate)?.is_some() {
            return Err(OperationError::Failed("zig-zags remain after sorting".into()).into());
        }
        Ok(candidate)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn remove_diapasons(&self, diapasons: &[ZigZagDiapason]) -> Result<NurbsCurve> {
        let domain = self.curve.domain();
        let params = self.curve.uniform_parameters(self.params.resample_count);
        let last = params.len() - 1;
        let steps = (self.params.widen_max / self.params.widen_step).round().max(1.0) as usize;

        for step in 1..=steps {
            let margin = self.params.widen_step * to_f64(step) * domain.length();
            let survivors: Vec<Point3> = params
                .iter()
                .enumerate()
                .filter(|(i, t)| {
                    *i == 0 || *i == last || !diapasons.iter().any(|d| d.covers(**t, margin))
                })
                .map(|(_, t)| self.curve.point_at(*t))
                .collect();
            if survivors.len() < 4 {
                break;
            }
            let candidate = self.refit(&survivors)?;
            if self.find(&candidate)?.is_none() {
                return Ok(candidate);
            }
        }
        Err(OperationError::Failed(format!(
            "zig-zags remain with removal bands up to {}% of the domain",
            self.params.widen_max * 100.0
        ))
        .into())
    }

    fn sort_control_points(&self, diapasons: &[ZigZagDiapason]) -> Result<NurbsCurve> {
        let positions = control_points_3d(self.curve, self.surface)?;
        let mut points = self.curve.control_points().to_vec();
        for d in diapasons {
            let order = nearest_neighbor_order(&positions[d.start..=d.end]);
            let run: Vec<Point3> = points[d.start..=d.end].to_vec();
            for (k, j) in order.into_iter().enumerate() {
                points[d.start + k] = run[j];
            }
        }
        self.refit(&points)
    }

    fn sort_sample_points(&self) -> Result<NurbsCurve> {
        let samples: Vec<Point3> = self
            .curve
            .uniform_parameters(self.params.sort_sample_count.max(4) - 1)
            .iter()
            .map(|t| self.curve.point_at(*t))
            .collect();
        let sorted: Vec<Point3> = nearest_neighbor_order(&samples)
            .into_iter()
            .map(|i| samples[i])
            .collect();
        self.refit(&sorted)
    }

    /// Curve with `points` as control points over the original domain,
    /// simplified.
    fn refit(&self, points: &[Point3]) -> Result<NurbsCurve> {
        let (dimension, degree) = (self.curve.dimension(), self.curve.degree());
        let dense = NurbsCurve::from_control_points(dimension, degree, points)?
            .with_domain(self.curve.domain());
        let mut op = SimplifyCurve::new(&dense).allow_singular_surfaces(true);
        if let Some(s) = self.surface {
            op = op.with_surface(s);
        }
        Ok(op.execute()?.result.value)
    }

    /// Largest turning angle over a coarse sampling; 0 for straight curves.
    fn smoothness(&self, curve: &NurbsCurve) -> Result<f64> {
        if curve.dimension() == 3 && curve.is_linear(TOLERANCE) {
            return Ok(0.0);
        }
        let poly = TessellateCurve::new(curve, TessellationParams::default())
            .on_optional_surface(self.surface)
            .with_segments(self.params.smoothness_samples)
            .execute()?;
        Ok(poly.max_turning_angle())
    }
}

/// Greedy nearest-neighbour tour that keeps the first and last point in place.
fn nearest_neighbor_order(points: &[Point3]) -> Vec<usize> {
    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }
    let mut remaining: Vec<usize> = (1..n - 1).collect();
    let mut order = Vec::with_capacity(n);
    order.push(0);
    let mut current = 0;
    while !remaining.is_empty() {
        let (k, _) = remaining
            .iter()
            .enumerate()
            .map(|(k, &j)| (k, (points[j] - points[current]).norm_squared()))
            .fold((0, f64::INFINITY), |best, c| if c.1 < best.1 { c } else { best });
        current = remaining.swap_remove(k);
        order.push(current);
    }
    order.push(n - 1);
    order
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn zigzag_curve() -> NurbsCurve {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.3, 0.0),
            Point3::new(2.0, 0.5, 0.0),
            Point3::new(1.5, 0.7, 0.0),
            Point3::new(4.0, 0.5, 0.0),
            Point3::new(5.0, 0.3, 0.0),
            Point3::new(6.0, 0.0, 0.0),
        ];
        NurbsCurve::from_control_points(3, 3, &pts).unwrap()
    }

    #[test]
    fn nearest_neighbor_keeps_ends() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        assert_eq!(nearest_neighbor_order(&pts), vec![0, 2, 1, 3]);
    }

    #[test]
    fn clean_curve_is_unchanged() {
        let pts: Vec<Point3> = (0..6_u32).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
        let c = NurbsCurve::from_control_points(3, 3, &pts).unwrap();
        let r = ZigZagRemove::new(&c).execute().unwrap();
        assert!(!r.changed);
        assert!(r.fail_reasons.is_empty());
    }

    #[test]
    fn removal_leaves_no_zigzag() {
        let c = zigzag_curve();
        let r = ZigZagRemove::new(&c).execute().unwrap();
        assert!(r.changed);
        assert!(r.applied.is_some());
        assert!(ZigZagFind::new(&r.value).execute().unwrap().is_none());
        assert!((r.value.start_point() - c.start_point()).norm() < 1e-9);
        assert!((r.value.end_point() - c.end_point()).norm() < 1e-9);
    }

    #[test]
    fn sort_control_points_untangles_run() {
        let c = zigzag_curve();
        let op = ZigZagRemove::new(&c);
        let indices = op.find(&c).unwrap().unwrap();
        let diapasons = group_with_gap(&c, &indices, 1);
        let sorted = op.run(ZigZagStrategy::SortControlPoints, &diapasons).unwrap();
        assert!(ZigZagFind::new(&sorted).execute().unwrap().is_none());
        assert!(sorted.control_point_count() <= c.control_point_count());
        assert_eq!(sorted.domain(), c.domain());
        assert!((sorted.start_point() - c.start_point()).norm() < 1e-9);
        assert!((sorted.end_point() - c.end_point()).norm() < 1e-9);
    }

    #[test]
    fn sorted_control_points_are_refitted() {
        let c = zigzag_curve();
        let op = ZigZagRemove::new(&c);
        let indices = op.find(&c).unwrap().unwrap();
        let diapasons = group_with_gap(&c, &indices, 1);
        let sorted = op.run(ZigZagStrategy::SortControlPoints, &diapasons).unwrap();
        let positions = control_points_3d(&c, None).unwrap();
        let mut reordered = c.control_points().to_vec();
        for d in &diapasons {
            let order = nearest_neighbor_order(&positions[d.start..=d.end]);
            for (k, j) in order.into_iter().enumerate() {
                reordered[d.start + k] = c.control_points()[d.start + j];
            }
        }
        let expected = op.refit(&reordered).unwrap();
        assert_eq!(sorted, expected);
    }
}
