use crate::error::{GeometryError, Result};
use crate::geometry::curve::Curve;
use crate::math::{to_f64, Interval, Point3, Vector3, TOLERANCE};

use super::knots;

/// Gauss–Legendre nodes and weights on `[-1, 1]`, 5 points.
const GAUSS_NODES: [f64; 5] = [
    -0.906_179_845_938_664,
    -0.538_469_310_105_683,
    0.0,
    0.538_469_310_105_683,
    0.906_179_845_938_664,
];
const GAUSS_WEIGHTS: [f64; 5] = [
    0.236_926_885_056_189,
    0.478_628_670_499_366,
    0.568_888_888_888_889,
    0.478_628_670_499_366,
    0.236_926_885_056_189,
];

/// A NURBS curve of dimension 2 (parameter-space trim) or 3.
///
/// 2D curves store their control points with `z = 0`. Weights are always
/// present; a curve is rational when any weight differs from `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsCurve {
    dimension: usize,
    degree: usize,
    control_points: Vec<Point3>,
    weights: Vec<f64>,
    knots: Vec<f64>,
}

impl NurbsCurve {
    /// Creates a curve after validating its definition.
    ///
    /// `weights` may be `None` for a non-rational curve.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidNurbs`] if the dimension is not 2 or 3,
    /// the degree is zero, there are too few control points, the weights
    /// are not positive, or the knot vector does not fit.
    pub fn try_new(
        dimension: usize,
        degree: usize,
        control_points: Vec<Point3>,
        weights: Option<Vec<f64>>,
        knots: Vec<f64>,
    ) -> Result<Self> {
        if dimension != 2 && dimension != 3 {
            return Err(
                GeometryError::InvalidNurbs(format!("unsupported dimension {dimension}")).into(),
            );
        }
        if degree == 0 {
            return Err(GeometryError::InvalidNurbs("degree must be at least 1".into()).into());
        }
        if control_points.len() < degree + 1 {
            return Err(GeometryError::InvalidNurbs(format!(
                "{} control points are too few for degree {degree}",
                control_points.len()
            ))
            .into());
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; control_points.len()]);
        if weights.len() != control_points.len() {
            return Err(
                GeometryError::InvalidNurbs("weights must match control points".into()).into(),
            );
        }
        if weights.iter().any(|w| *w <= 0.0 || !w.is_finite()) {
            return Err(GeometryError::InvalidNurbs("weights must be positive".into()).into());
        }
        knots::validate(&knots, degree, control_points.len())?;

        let control_points = if dimension == 2 {
            control_points.into_iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect()
        } else {
            control_points
        };

        Ok(Self {
            dimension,
            degree,
            control_points,
            weights,
            knots,
        })
    }

    /// Creates a non-rational curve using `points` as control points with a
    /// clamped uniform knot vector over `[0, 1]`.
    ///
    /// The degree is lowered when there are too few points for it.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 2 points are given.
    pub fn from_control_points(dimension: usize, degree: usize, points: &[Point3]) -> Result<Self> {
        if points.len() < 2 {
            return Err(crate::error::FitError::TooFewPoints {
                needed: 2,
                got: points.len(),
            }
            .into());
        }
        let degree = degree.clamp(1, points.len() - 1);
        let knots = knots::clamped_uniform(degree, points.len(), Interval::new(0.0, 1.0));
        Self::try_new(dimension, degree, points.to_vec(), None, knots)
    }

    /// Creates the degree-1 segment from `a` to `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimension is unsupported.
    pub fn line(dimension: usize, a: Point3, b: Point3) -> Result<Self> {
        Self::try_new(dimension, 1, vec![a, b], None, vec![0.0, 0.0, 1.0, 1.0])
    }

    /// Spatial dimension, 2 or 3.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Polynomial degree.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Control point locations.
    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    /// Number of control points.
    #[must_use]
    pub fn control_point_count(&self) -> usize {
        self.control_points.len()
    }

    /// Control point weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Knot vector.
    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Returns true if any weight differs from `1.0`.
    #[must_use]
    pub fn is_rational(&self) -> bool {
        self.weights.iter().any(|w| (w - 1.0).abs() > 1e-12)
    }

    /// Parameter domain.
    #[must_use]
    pub fn domain(&self) -> Interval {
        knots::domain(&self.knots, self.degree)
    }

    /// Number of non-empty knot spans.
    #[must_use]
    pub fn span_count(&self) -> usize {
        let d = self.domain();
        let mut spans = 0;
        for w in self.knots.windows(2) {
            if w[1] > w[0] && w[0] >= d.min && w[1] <= d.max {
                spans += 1;
            }
        }
        spans.max(1)
    }

    /// First control point, which is the curve start for clamped knots.
    #[must_use]
    pub fn start_point(&self) -> Point3 {
        self.point_at(self.domain().min)
    }

    /// Curve end point.
    #[must_use]
    pub fn end_point(&self) -> Point3 {
        self.point_at(self.domain().max)
    }

    /// End point at the given end.
    #[must_use]
    pub fn point_at_end(&self, end: crate::geometry::curve::CurveEnd) -> Point3 {
        match end {
            crate::geometry::curve::CurveEnd::Start => self.start_point(),
            crate::geometry::curve::CurveEnd::End => self.end_point(),
        }
    }

    /// Returns a copy with the given control points, keeping knots and weights.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of points differs.
    pub fn with_control_points(&self, points: Vec<Point3>) -> Result<Self> {
        if points.len() != self.control_points.len() {
            return Err(GeometryError::InvalidNurbs(format!(
                "expected {} control points, got {}",
                self.control_points.len(),
                points.len()
            ))
            .into());
        }
        Self::try_new(
            self.dimension,
            self.degree,
            points,
            Some(self.weights.clone()),
            self.knots.clone(),
        )
    }

    /// Moves one control point. Out-of-range indices are ignored.
    pub fn set_control_point(&mut self, index: usize, point: Point3) {
        if let Some(cp) = self.control_points.get_mut(index) {
            *cp = if self.dimension == 2 {
                Point3::new(point.x, point.y, 0.0)
            } else {
                point
            };
        }
    }

    /// Returns a copy whose knots are affinely mapped onto `domain`.
    #[must_use]
    pub fn with_domain(&self, domain: Interval) -> Self {
        let old = self.domain();
        let mut copy = self.clone();
        for k in &mut copy.knots {
            *k = domain.parameter_at(old.fraction_of(*k));
        }
        copy
    }

    /// Evaluates the curve at `t`.
    ///
    /// Parameters outside the domain extrapolate the end spans.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3 {
        let p = self.degree;
        let span = knots::find_span(&self.knots, p, self.control_points.len(), t);
        let basis = knots::basis_functions(&self.knots, span, t, p);

        let mut acc = Vector3::zeros();
        let mut w_sum = 0.0;
        for (i, b) in basis.iter().enumerate() {
            let idx = span - p + i;
            let bw = b * self.weights[idx];
            acc += self.control_points[idx].coords * bw;
            w_sum += bw;
        }
        if w_sum.abs() < f64::MIN_POSITIVE {
            return self.control_points[span];
        }
        Point3::from(acc / w_sum)
    }

    /// Point and derivatives up to order `n` at `t`; `result[0]` is the point as a vector.
    #[must_use]
    pub fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let p = self.degree;
        let span = knots::find_span(&self.knots, p, self.control_points.len(), t);
        let ders = knots::basis_derivatives(&self.knots, span, t, p, n);

        // Homogeneous derivatives A(k) and w(k).
        let mut a = vec![Vector3::zeros(); n + 1];
        let mut w = vec![0.0; n + 1];
        for k in 0..=n {
            for j in 0..=p {
                let idx = span - p + j;
                let bw = ders[k][j] * self.weights[idx];
                a[k] += self.control_points[idx].coords * bw;
                w[k] += bw;
            }
        }

        let mut c = vec![Vector3::zeros(); n + 1];
        if w[0].abs() < f64::MIN_POSITIVE {
            return c;
        }
        for k in 0..=n {
            let mut v = a[k];
            for i in 1..=k {
                v -= c[k - i] * (binomial(k, i) * w[i]);
            }
            c[k] = v / w[0];
        }
        c
    }

    /// Unit tangent at `t`, or the zero vector where the curve is degenerate.
    ///
    /// Falls back to a central difference where the first derivative
    /// vanishes (collapsed control points).
    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector3 {
        let d = self.derivatives_at(t, 1)[1];
        let len = d.norm();
        if len > TOLERANCE {
            return d / len;
        }
        let domain = self.domain();
        let h = domain.length() * 1e-6;
        let a = self.point_at(domain.clamp(t - h));
        let b = self.point_at(domain.clamp(t + h));
        let diff = b - a;
        let len = diff.norm();
        if len > TOLERANCE * 1e-3 {
            diff / len
        } else {
            Vector3::zeros()
        }
    }

    /// Curvature vector at `t` (points towards the center of curvature, length `1 / radius`).
    #[must_use]
    pub fn curvature_at(&self, t: f64) -> Vector3 {
        let ders = self.derivatives_at(t, 2);
        let d1 = ders[1];
        let d2 = ders[2];
        let speed_sq = d1.norm_squared();
        if speed_sq < TOLERANCE * TOLERANCE {
            return Vector3::zeros();
        }
        (d2 - d1 * (d1.dot(&d2) / speed_sq)) / speed_sq
    }

    /// Arc length over the whole domain.
    #[must_use]
    pub fn length(&self) -> f64 {
        let d = self.domain();
        self.length_between(d.min, d.max)
    }

    /// Arc length between two parameters (Gauss–Legendre per knot span).
    #[must_use]
    pub fn length_between(&self, t0: f64, t1: f64) -> f64 {
        let (a, b) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let mut breaks = vec![a];
        for k in &self.knots {
            if *k > a && *k < b && breaks.last().is_some_and(|last| *k > *last) {
                breaks.push(*k);
            }
        }
        breaks.push(b);

        let mut total = 0.0;
        for w in breaks.windows(2) {
            // Each span is split in two for accuracy on strongly curved spans.
            let mid = 0.5 * (w[0] + w[1]);
            for (lo, hi) in [(w[0], mid), (mid, w[1])] {
                let half = 0.5 * (hi - lo);
                let center = 0.5 * (hi + lo);
                for (x, wt) in GAUSS_NODES.iter().zip(GAUSS_WEIGHTS.iter()) {
                    let speed = self.derivatives_at(center + half * x, 1)[1].norm();
                    total += wt * half * speed;
                }
            }
        }
        total
    }

    /// Parameters of `count + 1` points equally spaced in parameter.
    #[must_use]
    pub fn uniform_parameters(&self, count: usize) -> Vec<f64> {
        let d = self.domain();
        let count = count.max(1);
        (0..=count)
            .map(|i| d.parameter_at(to_f64(i) / to_f64(count)))
            .collect()
    }

    /// Parameters dividing the curve into `count` pieces of equal length.
    #[must_use]
    pub fn divide_by_count(&self, count: usize) -> Vec<f64> {
        let table = ArcLengthTable::new(self, (count * 8).max(64));
        let count = count.max(1);
        (0..=count)
            .map(|i| table.parameter_at(to_f64(i) / to_f64(count)))
            .collect()
    }

    /// Parameter of the point on the curve closest to `point`.
    ///
    /// Coarse sampling locates the basin, golden-section search refines it.
    #[must_use]
    pub fn closest_point(&self, point: &Point3) -> f64 {
        let d = self.domain();
        let samples = (self.control_points.len() * self.degree * 4).clamp(64, 4000);
        let params = self.uniform_parameters(samples);

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, t) in params.iter().enumerate() {
            let dist = (self.point_at(*t) - point).norm_squared();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }

        let mut lo = params[best.saturating_sub(1)];
        let mut hi = params[(best + 1).min(params.len() - 1)];
        let ratio = 0.5 * (5f64.sqrt() - 1.0);
        let dist = |t: f64| (self.point_at(t) - point).norm_squared();
        let mut x1 = hi - ratio * (hi - lo);
        let mut x2 = lo + ratio * (hi - lo);
        let mut f1 = dist(x1);
        let mut f2 = dist(x2);
        for _ in 0..80 {
            if hi - lo < d.length() * 1e-14 {
                break;
            }
            if f1 < f2 {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - ratio * (hi - lo);
                f1 = dist(x1);
            } else {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + ratio * (hi - lo);
                f2 = dist(x2);
            }
        }
        let t = d.clamp(0.5 * (lo + hi));
        if dist(t) <= best_dist {
            t
        } else {
            params[best]
        }
    }

    /// Returns true if the start and end points coincide within `tol`.
    #[must_use]
    pub fn is_closed_within(&self, tol: f64) -> bool {
        (self.start_point() - self.end_point()).norm() <= tol
    }

    /// Returns true if every control point lies within `tol` of the chord
    /// between the end points.
    #[must_use]
    pub fn is_linear(&self, tol: f64) -> bool {
        let a = self.start_point();
        let b = self.end_point();
        let chord = b - a;
        let len = chord.norm();
        if len < TOLERANCE {
            return self.control_points.iter().all(|p| (p - a).norm() <= tol);
        }
        let dir = chord / len;
        self.control_points.iter().all(|p| {
            let v = p - a;
            let along = v.dot(&dir);
            along >= -tol && along <= len + tol && (v - dir * along).norm() <= tol
        })
    }
}

impl Curve for NurbsCurve {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.point_at(t))
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        let tangent = self.tangent_at(t);
        if tangent.norm() < 0.5 {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(tangent)
    }

    fn domain(&self) -> Interval {
        NurbsCurve::domain(self)
    }

    fn is_closed(&self) -> bool {
        self.is_closed_within(TOLERANCE)
    }
}

/// Lookup table mapping normalized arc length to curve parameters.
#[derive(Debug, Clone)]
pub struct ArcLengthTable {
    params: Vec<f64>,
    cumulative: Vec<f64>,
}

impl ArcLengthTable {
    /// Builds the table from `samples` chords along the curve.
    #[must_use]
    pub fn new(curve: &NurbsCurve, samples: usize) -> Self {
        let samples = samples.max(curve.span_count() * 8).clamp(16, 20_000);
        let params = curve.uniform_parameters(samples);
        let mut cumulative = Vec::with_capacity(params.len());
        let mut total = 0.0;
        let mut prev = curve.point_at(params[0]);
        cumulative.push(0.0);
        for t in &params[1..] {
            let p = curve.point_at(*t);
            total += (p - prev).norm();
            cumulative.push(total);
            prev = p;
        }
        Self { params, cumulative }
    }

    /// Total polyline length.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Parameter at normalized length `fraction` in `[0, 1]`.
    #[must_use]
    pub fn parameter_at(&self, fraction: f64) -> f64 {
        let total = self.total();
        let first = self.params[0];
        let last = self.params[self.params.len() - 1];
        if total < TOLERANCE {
            return first + fraction.clamp(0.0, 1.0) * (last - first);
        }
        let target = fraction.clamp(0.0, 1.0) * total;
        let idx = self.cumulative.partition_point(|c| *c < target);
        if idx == 0 {
            return first;
        }
        if idx >= self.cumulative.len() {
            return last;
        }
        let c0 = self.cumulative[idx - 1];
        let c1 = self.cumulative[idx];
        let s = if c1 - c0 > 0.0 { (target - c0) / (c1 - c0) } else { 0.0 };
        self.params[idx - 1] + s * (self.params[idx] - self.params[idx - 1])
    }

    /// Normalized length at parameter `t`.
    #[must_use]
    pub fn fraction_at(&self, t: f64) -> f64 {
        let total = self.total();
        if total < TOLERANCE {
            return 0.0;
        }
        let idx = self.params.partition_point(|p| *p < t);
        if idx == 0 {
            return 0.0;
        }
        if idx >= self.params.len() {
            return 1.0;
        }
        let t0 = self.params[idx - 1];
        let t1 = self.params[idx];
        let s = if t1 - t0 > 0.0 { (t - t0) / (t1 - t0) } else { 0.0 };
        (self.cumulative[idx - 1] + s * (self.cumulative[idx] - self.cumulative[idx - 1])) / total
    }
}

fn binomial(n: usize, k: usize) -> f64 {
    let mut r = 1.0;
    for i in 0..k {
        r = r * to_f64(n - i) / to_f64(i + 1);
    }
    r
}
