use crate::error::{FitError, GeometryError, Result};
use crate::geometry::nurbs::{chord_parameters, knots, NurbsCurve};
use crate::math::{to_f64, Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain};

/// A tensor-product NURBS surface.
///
/// Control points are stored row-major as `[u_index * count_v + v_index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsSurface {
    degrees: [usize; 2],
    counts: [usize; 2],
    control_points: Vec<Point3>,
    weights: Vec<f64>,
    knots: [Vec<f64>; 2],
}

impl NurbsSurface {
    /// Creates a surface after validating its definition.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidNurbs`] if the grid size, weights or
    /// knot vectors do not fit the degrees.
    pub fn try_new(
        degrees: [usize; 2],
        counts: [usize; 2],
        control_points: Vec<Point3>,
        weights: Option<Vec<f64>>,
        knots: [Vec<f64>; 2],
    ) -> Result<Self> {
        if control_points.len() != counts[0] * counts[1] {
            return Err(GeometryError::InvalidNurbs(format!(
                "grid of {} x {} needs {} control points, got {}",
                counts[0],
                counts[1],
                counts[0] * counts[1],
                control_points.len()
            ))
            .into());
        }
        for axis in 0..2 {
            if degrees[axis] == 0 || counts[axis] <= degrees[axis] {
                return Err(GeometryError::InvalidNurbs(format!(
                    "axis {axis}: {} control points cannot carry degree {}",
                    counts[axis], degrees[axis]
                ))
                .into());
            }
            knots::validate(&knots[axis], degrees[axis], counts[axis])?;
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; control_points.len()]);
        if weights.len() != control_points.len()
            || weights.iter().any(|w| *w <= 0.0 || !w.is_finite())
        {
            return Err(GeometryError::InvalidNurbs(
                "weights must be positive, one per control point".into(),
            )
            .into());
        }
        Ok(Self {
            degrees,
            counts,
            control_points,
            weights,
            knots,
        })
    }

    /// Interpolates a surface through a grid of points.
    ///
    /// `rows[i][j]` is the point at the `i`-th u and `j`-th v parameter. Both
    /// parameter directions use averaged chord lengths on `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is ragged, too small, or the
    /// interpolation systems are singular.
    pub fn interpolate(rows: &[Vec<Point3>], degrees: [usize; 2]) -> Result<Self> {
        let nu = rows.len();
        let nv = rows.first().map_or(0, Vec::len);
        if nu < 2 || nv < 2 || rows.iter().any(|r| r.len() != nv) {
            return Err(FitError::TooFewPoints {
                needed: 2,
                got: nu.min(nv),
            }
            .into());
        }

        let u_params =
            averaged_parameters((0..nv).map(|j| rows.iter().map(|r| r[j]).collect::<Vec<_>>()));
        let v_params = averaged_parameters(rows.iter().cloned());

        // Interpolate along v for each row, then along u for each column of the result.
        let mut partial: Vec<NurbsCurve> = Vec::with_capacity(nu);
        for row in rows {
            partial.push(NurbsCurve::interpolate_with_parameters(3, degrees[1], row, &v_params)?);
        }
        let degree_v = partial[0].degree();
        let knots_v = partial[0].knots().to_vec();

        let mut grid = vec![Point3::origin(); nu * nv];
        let mut knots_u = Vec::new();
        let mut degree_u = degrees[0];
        for j in 0..nv {
            let column: Vec<Point3> = partial.iter().map(|c| c.control_points()[j]).collect();
            let curve = NurbsCurve::interpolate_with_parameters(3, degrees[0], &column, &u_params)?;
            for (i, p) in curve.control_points().iter().enumerate() {
                grid[i * nv + j] = *p;
            }
            degree_u = curve.degree();
            knots_u = curve.knots().to_vec();
        }

        Self::try_new([degree_u, degree_v], [nu, nv], grid, None, [knots_u, knots_v])
    }

    /// Degree along `axis`.
    #[must_use]
    pub fn degree(&self, axis: usize) -> usize {
        self.degrees[axis.min(1)]
    }

    /// Number of control points along `axis`.
    #[must_use]
    pub fn count(&self, axis: usize) -> usize {
        self.counts[axis.min(1)]
    }

    /// Knot vector along `axis`.
    #[must_use]
    pub fn knots(&self, axis: usize) -> &[f64] {
        &self.knots[axis.min(1)]
    }

    /// Control point `(i, j)`.
    #[must_use]
    pub fn control_point(&self, i: usize, j: usize) -> Point3 {
        self.control_points[i * self.counts[1] + j]
    }

    /// All control points, row-major.
    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    /// Point and first partials by tensor-product basis derivatives.
    fn point_and_partials(&self, u: f64, v: f64) -> (Point3, Vector3, Vector3) {
        let [pu, pv] = self.degrees;
        let su = knots::find_span(&self.knots[0], pu, self.counts[0], u);
        let sv = knots::find_span(&self.knots[1], pv, self.counts[1], v);
        let bu = knots::basis_derivatives(&self.knots[0], su, u, pu, 1);
        let bv = knots::basis_derivatives(&self.knots[1], sv, v, pv, 1);

        // Homogeneous value and partials.
        let mut a = [Vector3::zeros(); 3];
        let mut w = [0.0; 3];
        for i in 0..=pu {
            let iu = su - pu + i;
            for j in 0..=pv {
                let iv = sv - pv + j;
                let idx = iu * self.counts[1] + iv;
                let wt = self.weights[idx];
                let cp = self.control_points[idx].coords * wt;
                for (k, (du, dv)) in [(0, 0), (1, 0), (0, 1)].into_iter().enumerate() {
                    let b = bu[du][i] * bv[dv][j];
                    a[k] += cp * b;
                    w[k] += wt * b;
                }
            }
        }
        if w[0].abs() < f64::MIN_POSITIVE {
            return (Point3::from(a[0]), Vector3::zeros(), Vector3::zeros());
        }
        let s = a[0] / w[0];
        let s_u = (a[1] - s * w[1]) / w[0];
        let s_v = (a[2] - s * w[2]) / w[0];
        (Point3::from(s), s_u, s_v)
    }

    /// Iso-parametric curve running along `axis` at the other parameter fixed to `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the extracted curve is invalid.
    pub fn iso_curve(&self, axis: usize, value: f64) -> Result<NurbsCurve> {
        let along = axis.min(1);
        let across = 1 - along;
        let p = self.degrees[across];
        let span = knots::find_span(&self.knots[across], p, self.counts[across], value);
        let basis = knots::basis_functions(&self.knots[across], span, value, p);

        let mut points = Vec::with_capacity(self.counts[along]);
        let mut weights = Vec::with_capacity(self.counts[along]);
        for a in 0..self.counts[along] {
            let mut acc = Vector3::zeros();
            let mut wsum = 0.0;
            for (k, b) in basis.iter().enumerate() {
                let c = span - p + k;
                let (i, j) = if along == 0 { (a, c) } else { (c, a) };
                let idx = i * self.counts[1] + j;
                let wb = self.weights[idx] * b;
                acc += self.control_points[idx].coords * wb;
                wsum += wb;
            }
            if wsum.abs() < f64::MIN_POSITIVE {
                return Err(GeometryError::Degenerate("iso-curve weights vanish".into()).into());
            }
            points.push(Point3::from(acc / wsum));
            weights.push(wsum);
        }
        NurbsCurve::try_new(
            3,
            self.degrees[along],
            points,
            Some(weights),
            self.knots[along].clone(),
        )
    }
}

/// Chord-length parameters averaged over several point sequences.
fn averaged_parameters(sequences: impl Iterator<Item = Vec<Point3>>) -> Vec<f64> {
    let mut sum: Vec<f64> = Vec::new();
    let mut used = 0usize;
    for seq in sequences {
        let total: f64 = seq.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        if total < TOLERANCE {
            continue;
        }
        let params = chord_parameters(&seq);
        if sum.is_empty() {
            sum = params;
        } else {
            for (s, p) in sum.iter_mut().zip(params) {
                *s += p;
            }
        }
        used += 1;
    }
    if used == 0 {
        return sum;
    }
    sum.iter().map(|s| s / to_f64(used)).collect()
}

impl Surface for NurbsSurface {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        Ok(self.point_and_partials(u, v).0)
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let (_, su, sv) = self.point_and_partials(u, v);
        let n = su.cross(&sv);
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(
            knots::domain(&self.knots[0], self.degrees[0]),
            knots::domain(&self.knots[1], self.degrees[1]),
        )
    }

    fn is_linear(&self, axis: usize) -> bool {
        self.degree(axis) == 1
    }

    fn partials(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)> {
        let (_, su, sv) = self.point_and_partials(u, v);
        Ok((su, sv))
    }
}

impl NurbsSurface {
    /// Unit-square bilinear patch through four corners.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch definition is invalid.
    pub fn bilinear(p00: Point3, p10: Point3, p01: Point3, p11: Point3) -> Result<Self> {
        let k = vec![0.0, 0.0, 1.0, 1.0];
        Self::try_new([1, 1], [2, 2], vec![p00, p01, p10, p11], None, [k.clone(), k])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dome_rows() -> Vec<Vec<Point3>> {
        (0..6)
            .map(|i| {
                (0..5)
                    .map(|j| {
                        let x = to_f64(i);
                        let y = to_f64(j);
                        Point3::new(x, y, (x * 0.5).sin() + (y * 0.4).cos())
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn interpolation_hits_grid() {
        let rows = dome_rows();
        let s = NurbsSurface::interpolate(&rows, [3, 3]).unwrap();
        let corner = s.evaluate(0.0, 0.0).unwrap();
        assert!((corner - rows[0][0]).norm() < 1e-9);
        let far = s.evaluate(1.0, 1.0).unwrap();
        assert!((far - rows[5][4]).norm() < 1e-9);
    }

    #[test]
    fn partials_match_finite_difference() {
        let s = NurbsSurface::interpolate(&dome_rows(), [3, 2]).unwrap();
        let (u, v, h) = (0.37, 0.61, 1e-6);
        let (su, sv) = s.partials(u, v).unwrap();
        let fu = (s.evaluate(u + h, v).unwrap() - s.evaluate(u - h, v).unwrap()) / (2.0 * h);
        let fv = (s.evaluate(u, v + h).unwrap() - s.evaluate(u, v - h).unwrap()) / (2.0 * h);
        assert!((su - fu).norm() < 1e-5);
        assert!((sv - fv).norm() < 1e-5);
    }

    #[test]
    fn iso_curve_lies_on_surface() {
        let s = NurbsSurface::interpolate(&dome_rows(), [3, 3]).unwrap();
        let iso = s.iso_curve(0, 0.3).unwrap();
        for t in iso.uniform_parameters(10) {
            let on = s.evaluate(t, 0.3).unwrap();
            assert!((iso.point_at(t) - on).norm() < 1e-9);
        }
    }

    #[test]
    fn closest_point_recovers_parameters() {
        let s = NurbsSurface::interpolate(&dome_rows(), [3, 3]).unwrap();
        let p = s.evaluate(0.42, 0.73).unwrap();
        let uv = s.closest_point(&p).unwrap();
        assert_relative_eq!(uv.u(), 0.42, epsilon = 1e-6);
        assert_relative_eq!(uv.v(), 0.73, epsilon = 1e-6);
    }

    #[test]
    fn bilinear_is_linear() {
        let s = NurbsSurface::bilinear(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.5),
        )
        .unwrap();
        assert!(s.is_linear(0) && s.is_linear(1));
        let p = s.evaluate(1.0, 0.0).unwrap();
        assert!((p - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn ragged_grid_rejected() {
        let mut rows = dome_rows();
        rows[2].pop();
        assert!(NurbsSurface::interpolate(&rows, [3, 3]).is_err());
    }
}
