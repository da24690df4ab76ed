//! Knot insertion, splitting, trimming, reversal, degree elevation and joining.
//!
//! All routines assume clamped knot vectors, which every constructor in
//! this crate produces.

use nalgebra::Vector4;

use crate::error::{FitError, GeometryError, Result};
use crate::geometry::curve::{Arc, Curve};
use crate::math::{to_f64, Interval, Point3, TOLERANCE};

use super::knots;
use super::NurbsCurve;

fn to_homogeneous(p: &Point3, w: f64) -> Vector4<f64> {
    Vector4::new(p.x * w, p.y * w, p.z * w, w)
}

fn from_homogeneous(h: &Vector4<f64>) -> (Point3, f64) {
    (Point3::new(h.x / h.w, h.y / h.w, h.z / h.w), h.w)
}

impl NurbsCurve {
    fn homogeneous(&self) -> Vec<Vector4<f64>> {
        self.control_points()
            .iter()
            .zip(self.weights())
            .map(|(p, w)| to_homogeneous(p, *w))
            .collect()
    }

    fn from_homogeneous_parts(
        dimension: usize,
        degree: usize,
        hw: &[Vector4<f64>],
        knots: Vec<f64>,
    ) -> Result<Self> {
        let (points, weights): (Vec<Point3>, Vec<f64>) = hw.iter().map(from_homogeneous).unzip();
        Self::try_new(dimension, degree, points, Some(weights), knots)
    }

    /// Inserts the knot `t` up to `times` times (Boehm's algorithm).
    ///
    /// Insertion stops once the multiplicity reaches the degree. Parameters
    /// outside the open domain leave the curve unchanged.
    #[must_use]
    pub fn insert_knot(&self, t: f64, times: usize) -> Self {
        let p = self.degree();
        let d = self.domain();
        if t <= d.min || t >= d.max || times == 0 {
            return self.clone();
        }
        let up = self.knots();
        #[allow(clippy::float_cmp)]
        let s = up.iter().filter(|k| **k == t).count();
        if s >= p {
            return self.clone();
        }
        let r = times.min(p - s);
        let n = self.control_point_count();
        let k = knots::find_span(up, p, n, t);
        let pw = self.homogeneous();
        let np = n - 1;
        let mp = np + p + 1;

        let mut uq = vec![0.0; mp + r + 1];
        uq[..=k].copy_from_slice(&up[..=k]);
        for i in 1..=r {
            uq[k + i] = t;
        }
        for i in k + 1..=mp {
            uq[i + r] = up[i];
        }

        let mut qw = vec![Vector4::zeros(); n + r];
        qw[..=k - p].copy_from_slice(&pw[..=k - p]);
        for i in k - s..=np {
            qw[i + r] = pw[i];
        }
        let mut rw: Vec<Vector4<f64>> = (0..=p - s).map(|i| pw[k - p + i]).collect();

        let mut l = k - p;
        for j in 1..=r {
            l = k - p + j;
            for i in 0..=p - j - s {
                let alpha = (t - up[l + i]) / (up[i + k + 1] - up[l + i]);
                rw[i] = rw[i + 1] * alpha + rw[i] * (1.0 - alpha);
            }
            qw[l] = rw[0];
            qw[k + r - j - s] = rw[p - j - s];
        }
        for i in l + 1..k - s {
            qw[i] = rw[i - l];
        }

        // Boehm's algorithm cannot fail on a valid curve.
        Self::from_homogeneous_parts(self.dimension(), p, &qw, uq).unwrap_or_else(|_| self.clone())
    }

    /// Splits the curve at `t` into two curves sharing the point at `t`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ParameterOutOfRange`] if `t` is not strictly
    /// inside the domain.
    pub fn split(&self, t: f64) -> Result<(Self, Self)> {
        let d = self.domain();
        let eps = d.length() * 1e-12;
        if t <= d.min + eps || t >= d.max - eps {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "t",
                value: t,
                min: d.min,
                max: d.max,
            }
            .into());
        }
        // Snap onto an existing knot so multiplicities are counted correctly.
        let t = self
            .knots()
            .iter()
            .copied()
            .find(|k| (k - t).abs() <= eps * 10.0)
            .unwrap_or(t);

        let p = self.degree();
        let refined = self.insert_knot(t, p);
        let u = refined.knots();
        #[allow(clippy::float_cmp)]
        let first = u.iter().position(|k| *k == t).unwrap_or(p + 1);
        let hw = refined.homogeneous();

        let mut left_knots = u[..first + p].to_vec();
        left_knots.push(t);
        let mut right_knots = vec![t];
        right_knots.extend_from_slice(&u[first..]);

        let left = Self::from_homogeneous_parts(self.dimension(), p, &hw[..first], left_knots)?;
        let right =
            Self::from_homogeneous_parts(self.dimension(), p, &hw[first - 1..], right_knots)?;
        Ok((left, right))
    }

    /// Restricts the curve to `[t0, t1]`, keeping the original parameterization.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the resulting interval is empty.
    pub fn trim(&self, t0: f64, t1: f64) -> Result<Self> {
        let d = self.domain();
        let interval = Interval::new(d.clamp(t0), d.clamp(t1));
        let eps = d.length() * 1e-9;
        if interval.length() <= eps {
            return Err(GeometryError::Degenerate(format!(
                "trim interval [{}, {}] is empty",
                interval.min, interval.max
            ))
            .into());
        }
        let mut curve = self.clone();
        if interval.min > d.min + eps {
            curve = curve.split(interval.min)?.1;
        }
        if interval.max < d.max - eps {
            curve = curve.split(interval.max)?.0;
        }
        Ok(curve)
    }

    /// Reverses the direction; the domain is mirrored onto itself.
    #[must_use]
    pub fn reverse(&self) -> Self {
        let d = self.domain();
        let mut points = self.control_points().to_vec();
        let mut weights = self.weights().to_vec();
        points.reverse();
        weights.reverse();
        let knots: Vec<f64> = self.knots().iter().rev().map(|k| d.min + d.max - k).collect();
        Self::try_new(self.dimension(), self.degree(), points, Some(weights), knots)
            .unwrap_or_else(|_| self.clone())
    }

    /// Raises the degree to `target` without changing the shape.
    ///
    /// The curve is decomposed into Bézier segments, each segment is
    /// elevated, and the pieces are reassembled with C0 interior knots.
    #[must_use]
    pub fn elevate_degree(&self, target: usize) -> Self {
        let p = self.degree();
        if target <= p {
            return self.clone();
        }

        let mut decomposed = self.clone();
        let d = self.domain();
        let mut breaks: Vec<f64> = Vec::new();
        for k in self.knots() {
            if *k > d.min && *k < d.max && breaks.last().is_none_or(|last| k > last) {
                breaks.push(*k);
            }
        }
        for t in &breaks {
            decomposed = decomposed.insert_knot(*t, p);
        }

        let hw = decomposed.homogeneous();
        let segments = breaks.len() + 1;
        let mut out: Vec<Vector4<f64>> = Vec::new();
        for s in 0..segments {
            let mut seg: Vec<Vector4<f64>> = hw[s * p..=s * p + p].to_vec();
            for current in p..target {
                seg = elevate_bezier(&seg, current);
            }
            if s == 0 {
                out.extend(seg);
            } else {
                out.extend(seg.into_iter().skip(1));
            }
        }

        let mut knots = vec![d.min; target + 1];
        for t in &breaks {
            knots.extend(std::iter::repeat(*t).take(target));
        }
        knots.extend(std::iter::repeat(d.max).take(target + 1));
        Self::from_homogeneous_parts(self.dimension(), target, &out, knots)
            .unwrap_or_else(|_| self.clone())
    }

    /// Appends `other` to the end of this curve.
    ///
    /// The lower-degree curve is elevated first. `other` is scaled in
    /// parameter so that both pieces have a similar parameter speed, and its
    /// weights are scaled to match at the junction. The result keeps this
    /// curve's parameterization over its original domain.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Incompatible`] if the dimensions differ or the end
    /// of this curve is farther than `tol` from the start of `other`.
    pub fn join(&self, other: &Self, tol: f64) -> Result<Self> {
        if self.dimension() != other.dimension() {
            return Err(
                FitError::Incompatible("cannot join curves of different dimension".into()).into(),
            );
        }
        let gap = (self.end_point() - other.start_point()).norm();
        if gap > tol {
            return Err(FitError::Incompatible(format!("curves are {gap:e} apart")).into());
        }
        let degree = self.degree().max(other.degree());
        let a = self.elevate_degree(degree);
        let b = other.elevate_degree(degree);

        let da = a.domain();
        let db = b.domain();
        let len_a = a.length();
        let len_b = b.length();
        let span = if len_a > TOLERANCE && len_b > TOLERANCE {
            da.length() * len_b / len_a
        } else {
            db.length()
        };
        let target = Interval::new(da.max, da.max + span.max(da.length() * 1e-6));
        let b_knots: Vec<f64> = b
            .knots()
            .iter()
            .map(|k| target.parameter_at(db.fraction_of(*k)))
            .collect();

        let wa = a.weights()[a.control_point_count() - 1];
        let scale = wa / b.weights()[0];

        let mut points = a.control_points().to_vec();
        let mut weights = a.weights().to_vec();
        points.extend_from_slice(&b.control_points()[1..]);
        weights.extend(b.weights()[1..].iter().map(|w| w * scale));

        let mut knots = a.knots()[..a.knots().len() - 1].to_vec();
        knots.extend_from_slice(&b_knots[degree + 1..]);

        Self::try_new(self.dimension(), degree, points, Some(weights), knots)
    }

    /// Exact rational representation of a circular arc.
    ///
    /// The sweep is split into quadratic segments of at most a quarter turn.
    /// The domain is `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the arc has no sweep.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_arc(dimension: usize, arc: &Arc) -> Result<Self> {
        let d = Curve::domain(arc);
        let sweep = d.length();
        if sweep < TOLERANCE {
            return Err(GeometryError::Degenerate("arc has no sweep".into()).into());
        }
        let segments = ((sweep / std::f64::consts::FRAC_PI_2 - 1e-9).ceil() as usize).max(1);
        let step = sweep / to_f64(segments);
        let half_tan = (step * 0.5).tan();
        let w_mid = (step * 0.5).cos();

        let mut points = vec![arc.evaluate(d.min)?];
        let mut weights = vec![1.0];
        let mut knots = vec![0.0; 3];
        for s in 0..segments {
            let a0 = d.min + step * to_f64(s);
            let a1 = a0 + step;
            let p0 = arc.evaluate(a0)?;
            let t0 = arc.tangent(a0)?;
            points.push(p0 + t0 * (arc.radius() * half_tan));
            weights.push(w_mid);
            points.push(arc.evaluate(a1)?);
            weights.push(1.0);
            if s + 1 < segments {
                let k = to_f64(s + 1) / to_f64(segments);
                knots.extend([k, k]);
            }
        }
        knots.extend([1.0; 3]);
        Self::try_new(dimension, 2, points, Some(weights), knots)
    }
}

/// Elevates a homogeneous Bézier segment of `degree` by one.
fn elevate_bezier(seg: &[Vector4<f64>], degree: usize) -> Vec<Vector4<f64>> {
    let n1 = to_f64(degree + 1);
    let mut out = Vec::with_capacity(seg.len() + 1);
    out.push(seg[0]);
    for i in 1..=degree {
        let a = to_f64(i) / n1;
        out.push(seg[i - 1] * a + seg[i] * (1.0 - a));
    }
    out.push(seg[degree]);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use approx::assert_relative_eq;

    fn wave() -> NurbsCurve {
        let pts: Vec<Point3> = (0..7)
            .map(|i| Point3::new(to_f64(i), if i % 2 == 0 { 0.0 } else { 1.0 }, 0.0))
            .collect();
        NurbsCurve::from_control_points(3, 3, &pts).unwrap()
    }

    fn same_shape(a: &NurbsCurve, b: &NurbsCurve, params: &[f64]) {
        for t in params {
            assert!((a.point_at(*t) - b.point_at(*t)).norm() < 1e-9, "t={t}");
        }
    }

    #[test]
    fn knot_insertion_keeps_shape() {
        let c = wave();
        let r = c.insert_knot(0.3, 2);
        assert_eq!(r.control_point_count(), c.control_point_count() + 2);
        same_shape(&c, &r, &c.uniform_parameters(40));
    }

    #[test]
    fn split_halves_meet() {
        let c = wave();
        let (l, r) = c.split(0.4).unwrap();
        assert_relative_eq!(l.domain().max, 0.4);
        assert_relative_eq!(r.domain().min, 0.4);
        assert!((l.end_point() - r.start_point()).norm() < 1e-12);
        same_shape(&c, &l, &l.uniform_parameters(20));
        same_shape(&c, &r, &r.uniform_parameters(20));
    }

    #[test]
    fn split_at_existing_knot() {
        let c = wave();
        let k = c.knots()[5];
        let (l, r) = c.split(k).unwrap();
        same_shape(&c, &l, &l.uniform_parameters(10));
        same_shape(&c, &r, &r.uniform_parameters(10));
    }

    #[test]
    fn split_outside_domain_fails() {
        assert!(wave().split(1.0).is_err());
    }

    #[test]
    fn trim_keeps_parameters() {
        let c = wave();
        let t = c.trim(0.1, 0.8).unwrap();
        assert_relative_eq!(t.domain().min, 0.1, epsilon = 1e-12);
        assert_relative_eq!(t.domain().max, 0.8, epsilon = 1e-12);
        same_shape(&c, &t, &t.uniform_parameters(30));
    }

    #[test]
    fn reverse_mirrors() {
        let c = wave();
        let r = c.reverse();
        for t in c.uniform_parameters(10) {
            assert!((c.point_at(t) - r.point_at(1.0 - t)).norm() < 1e-12);
        }
    }

    #[test]
    fn elevation_keeps_shape() {
        let c = wave();
        let e = c.elevate_degree(5);
        assert_eq!(e.degree(), 5);
        same_shape(&c, &e, &c.uniform_parameters(40));
    }

    #[test]
    fn join_continues_curve() {
        let c = wave();
        let (l, r) = c.split(0.6).unwrap();
        let j = l.join(&r, 1e-9).unwrap();
        assert!((j.end_point() - c.end_point()).norm() < 1e-9);
        same_shape(&c, &j, &l.uniform_parameters(20));
        assert_relative_eq!(j.length(), c.length(), epsilon = 1e-6);
    }

    #[test]
    fn join_rejects_gap() {
        let a = NurbsCurve::line(3, Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap();
        let b =
            NurbsCurve::line(3, Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)).unwrap();
        assert!(a.join(&b, 1e-6).is_err());
    }

    #[test]
    fn arc_conversion_is_exact() {
        let arc = Arc::new(Point3::origin(), 2.0, Vector3::z(), Vector3::x(), 0.0, 4.0).unwrap();
        let c = NurbsCurve::from_arc(3, &arc).unwrap();
        for t in c.uniform_parameters(50) {
            assert_relative_eq!(c.point_at(t).coords.norm(), 2.0, epsilon = 1e-12);
        }
        assert_relative_eq!(c.length(), 8.0, epsilon = 1e-6);
        assert!((c.end_point() - arc.evaluate(4.0).unwrap()).norm() < 1e-12);
    }
}
