//! Interpolation and least-squares fitting.

use nalgebra::{DMatrix, DVector};

use crate::error::{FitError, Result};
use crate::math::{to_f64, Interval, Point3};

use super::knots;
use super::NurbsCurve;

impl NurbsCurve {
    /// Interpolates a curve through `points` using chord-length parameters
    /// on `[0, 1]`.
    ///
    /// Consecutive duplicate points are dropped and the degree is lowered
    /// when there are too few points for it.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::TooFewPoints`] for fewer than 2 distinct points,
    /// or [`FitError::Singular`] if the interpolation system cannot be solved.
    pub fn interpolate(dimension: usize, degree: usize, points: &[Point3]) -> Result<Self> {
        let points = dedup_points(points, 1e-12);
        if points.len() < 2 {
            return Err(FitError::TooFewPoints {
                needed: 2,
                got: points.len(),
            }
            .into());
        }
        let params = chord_parameters(&points);
        Self::interpolate_with_parameters(dimension, degree, &points, &params)
    }

    /// Interpolates a curve through `points` at the given strictly increasing `params`.
    ///
    /// The resulting domain is `[params[0], params[last]]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the counts differ, the parameters do not increase,
    /// or the system is singular.
    pub fn interpolate_with_parameters(
        dimension: usize,
        degree: usize,
        points: &[Point3],
        params: &[f64],
    ) -> Result<Self> {
        let n = points.len();
        if n < 2 || params.len() != n {
            return Err(FitError::TooFewPoints { needed: 2, got: n.min(params.len()) }.into());
        }
        if params.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FitError::Singular("interpolation parameters must increase".into()).into());
        }
        let degree = degree.clamp(1, n - 1);
        let knot_vector = knots::averaged(params, degree);

        let mut a = DMatrix::<f64>::zeros(n, n);
        for (row, t) in params.iter().enumerate() {
            let span = knots::find_span(&knot_vector, degree, n, *t);
            let basis = knots::basis_functions(&knot_vector, span, *t, degree);
            for (j, b) in basis.iter().enumerate() {
                a[(row, span - degree + j)] = *b;
            }
        }

        let control_points = solve_columns(a, points)?;
        Self::try_new(dimension, degree, control_points, None, knot_vector)
    }

    /// Least-squares approximation of `points` at `params` by `count`
    /// control points. The end points are interpolated exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer points than control points, the
    /// parameters do not increase, or the normal equations are singular.
    pub fn fit(
        dimension: usize,
        degree: usize,
        points: &[Point3],
        params: &[f64],
        count: usize,
    ) -> Result<Self> {
        let m = points.len();
        if params.len() != m {
            return Err(FitError::TooFewPoints { needed: m, got: params.len() }.into());
        }
        if count < 2 {
            return Err(FitError::TooFewPoints { needed: 2, got: count }.into());
        }
        if m < count {
            return Err(FitError::TooFewPoints { needed: count, got: m }.into());
        }
        if params.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FitError::Singular("fit parameters must increase".into()).into());
        }
        if m == count {
            return Self::interpolate_with_parameters(dimension, degree, points, params);
        }
        let degree = degree.clamp(1, count - 1);
        let knot_vector = knots::approximating(params, degree, count);

        let first = points[0];
        let last = points[m - 1];
        if count == 2 {
            let (t0, t1) = (params[0], params[m - 1]);
            return Self::try_new(dimension, 1, vec![first, last], None, vec![t0, t0, t1, t1]);
        }

        // Unknowns are the interior control points 1..count-1.
        let unknowns = count - 2;
        let rows = m - 2;
        let mut nmat = DMatrix::<f64>::zeros(rows, unknowns);
        let mut r = vec![Point3::origin(); rows];
        for k in 1..m - 1 {
            let t = params[k];
            let span = knots::find_span(&knot_vector, degree, count, t);
            let basis = knots::basis_functions(&knot_vector, span, t, degree);
            let mut rk = points[k].coords;
            for (j, b) in basis.iter().enumerate() {
                let idx = span - degree + j;
                if idx == 0 {
                    rk -= first.coords * *b;
                } else if idx == count - 1 {
                    rk -= last.coords * *b;
                } else {
                    nmat[(k - 1, idx - 1)] = *b;
                }
            }
            r[k - 1] = Point3::from(rk);
        }

        let ntn = nmat.transpose() * &nmat;
        let nt = nmat.transpose();
        let lu = ntn.lu();
        let mut interior = vec![Point3::origin(); unknowns];
        for axis in 0..3 {
            let rhs = &nt * DVector::from_iterator(rows, r.iter().map(|p| p[axis]));
            let solved = lu
                .solve(&rhs)
                .ok_or_else(|| FitError::Singular("least-squares normal equations".into()))?;
            for (i, v) in solved.iter().enumerate() {
                interior[i][axis] = *v;
            }
        }

        let mut control_points = Vec::with_capacity(count);
        control_points.push(first);
        control_points.extend(interior);
        control_points.push(last);
        Self::try_new(dimension, degree, control_points, None, knot_vector)
    }

    /// Rebuilds the curve with `count` control points and the given degree.
    ///
    /// The curve is sampled at uniform parameters and refitted at those same
    /// parameters over the original domain. Speed changes sharper than the
    /// new knot spacing are smoothed out. End points are preserved exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the fit fails.
    pub fn rebuild(&self, count: usize, degree: usize) -> Result<Self> {
        let count = count.max(2);
        let samples = (count * 8).max(self.control_point_count() * 4).clamp(200, 4000);
        let params = self.uniform_parameters(samples);
        let points: Vec<Point3> = params.iter().map(|t| self.point_at(*t)).collect();
        let mut rebuilt = Self::fit(self.dimension(), degree, &points, &params, count)?;
        let last = rebuilt.control_point_count() - 1;
        rebuilt.set_control_point(0, self.start_point());
        rebuilt.set_control_point(last, self.end_point());
        Ok(rebuilt)
    }
}

/// Chord-length parameters of `points`, normalized to `[0, 1]`.
///
/// Falls back to uniform parameters when all points coincide.
#[must_use]
pub fn chord_parameters(points: &[Point3]) -> Vec<f64> {
    let mut params = Vec::with_capacity(points.len());
    let mut total = 0.0;
    params.push(0.0);
    for w in points.windows(2) {
        total += (w[1] - w[0]).norm();
        params.push(total);
    }
    if total <= 0.0 {
        let n = points.len().max(2) - 1;
        return (0..points.len()).map(|i| to_f64(i) / to_f64(n)).collect();
    }
    let domain = Interval::new(0.0, total);
    params.iter().map(|p| domain.fraction_of(*p)).collect()
}

/// Drops consecutive points closer than `tol`, always keeping the last point.
#[must_use]
pub fn dedup_points(points: &[Point3], tol: f64) -> Vec<Point3> {
    let mut out: Vec<Point3> = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let kept = out.len();
        match out.last_mut() {
            Some(last) if (*p - *last).norm() <= tol => {
                if i == points.len() - 1 && kept > 1 {
                    *last = *p;
                }
            }
            _ => out.push(*p),
        }
    }
    out
}

/// Solves `a * X = points` column by column.
fn solve_columns(a: DMatrix<f64>, points: &[Point3]) -> Result<Vec<Point3>> {
    let n = points.len();
    let lu = a.lu();
    let mut out = vec![Point3::origin(); n];
    for axis in 0..3 {
        let b = DVector::from_iterator(n, points.iter().map(|p| p[axis]));
        let x = lu
            .solve(&b)
            .ok_or_else(|| FitError::Singular("interpolation matrix".into()))?;
        for (i, v) in x.iter().enumerate() {
            out[i][axis] = *v;
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine_points(n: usize) -> Vec<Point3> {
        (0..n)
            .map(|i| {
                let x = to_f64(i) / to_f64(n - 1) * 6.0;
                Point3::new(x, x.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn interpolation_passes_through_points() {
        let pts = sine_points(12);
        let c = NurbsCurve::interpolate(3, 3, &pts).unwrap();
        let params = chord_parameters(&pts);
        for (p, t) in pts.iter().zip(params) {
            assert!((c.point_at(t) - p).norm() < 1e-9);
        }
    }

    #[test]
    fn interpolation_lowers_degree() {
        let pts = [Point3::origin(), Point3::new(1.0, 1.0, 0.0)];
        let c = NurbsCurve::interpolate(3, 3, &pts).unwrap();
        assert_eq!(c.degree(), 1);
    }

    #[test]
    fn interpolation_rejects_single_point() {
        let pts = [Point3::origin(), Point3::origin()];
        assert!(NurbsCurve::interpolate(3, 3, &pts).is_err());
    }

    #[test]
    fn rebuild_keeps_shape_and_domain() {
        let c = NurbsCurve::interpolate(3, 3, &sine_points(40)).unwrap();
        let r = c.rebuild(15, 3).unwrap();
        assert_eq!(r.control_point_count(), 15);
        assert_relative_eq!(r.domain().min, c.domain().min);
        assert_relative_eq!(r.domain().max, c.domain().max);
        for t in c.uniform_parameters(50) {
            assert!((r.point_at(t) - c.point_at(t)).norm() < 5e-3);
        }
        assert!((r.start_point() - c.start_point()).norm() < 1e-12);
        assert!((r.end_point() - c.end_point()).norm() < 1e-12);
    }

    #[test]
    fn fit_two_points_is_line() {
        let pts = sine_points(10);
        let params = chord_parameters(&pts);
        let c = NurbsCurve::fit(3, 3, &pts, &params, 2).unwrap();
        assert_eq!(c.degree(), 1);
        assert_eq!(c.control_point_count(), 2);
    }

    #[test]
    fn dedup_keeps_last() {
        let pts = [
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let d = dedup_points(&pts, 1e-9);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn dedup_replaces_near_last_point() {
        let end = Point3::new(1.0, 1e-12, 0.0);
        let pts = [Point3::origin(), Point3::new(1.0, 0.0, 0.0), end];
        let d = dedup_points(&pts, 1e-9);
        assert_eq!(d, vec![Point3::origin(), end]);

        let pair = [Point3::origin(), Point3::new(1e-12, 0.0, 0.0)];
        assert_eq!(dedup_points(&pair, 1e-9), vec![Point3::origin()]);
    }
}
