//! Knot-vector utilities shared by curves and surfaces.

use crate::error::{GeometryError, Result};
use crate::math::{to_f64, Interval};

/// Checks that a knot vector fits `count` control points of the given degree.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidNurbs`] if the length is wrong, the knots
/// decrease, or the domain is empty.
pub fn validate(knots: &[f64], degree: usize, count: usize) -> Result<()> {
    if knots.len() != count + degree + 1 {
        return Err(GeometryError::InvalidNurbs(format!(
            "knot vector length {} must be {} (count {count} + degree {degree} + 1)",
            knots.len(),
            count + degree + 1
        ))
        .into());
    }
    if knots.windows(2).any(|w| w[1] < w[0] || !w[0].is_finite()) {
        return Err(
            GeometryError::InvalidNurbs("knots must be finite and non-decreasing".into()).into(),
        );
    }
    if knots[knots.len() - degree - 1] - knots[degree] <= 0.0 {
        return Err(GeometryError::InvalidNurbs("empty parameter domain".into()).into());
    }
    Ok(())
}

/// Parameter domain `[knots[p], knots[n + 1]]`.
#[must_use]
pub fn domain(knots: &[f64], degree: usize) -> Interval {
    Interval::new(knots[degree], knots[knots.len() - degree - 1])
}

/// Knot span index containing `t`, using binary search.
///
/// Parameters outside the domain map to the first or last span, so the
/// basis functions extrapolate the end polynomials.
#[must_use]
pub fn find_span(knots: &[f64], degree: usize, count: usize, t: f64) -> usize {
    let n = count - 1;
    let p = degree;

    if t >= knots[n + 1] {
        // Last non-empty span.
        let mut span = n;
        while span > p && knots[span] >= knots[n + 1] {
            span -= 1;
        }
        return span;
    }
    if t <= knots[p] {
        let mut span = p;
        while span < n && knots[span + 1] <= knots[p] {
            span += 1;
        }
        return span;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-vanishing B-spline basis functions `N[span - p ..= span]` at `t`.
#[must_use]
pub fn basis_functions(knots: &[f64], span: usize, t: f64, degree: usize) -> Vec<f64> {
    let p = degree;
    let mut n_vals = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    n_vals[0] = 1.0;
    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = n_vals[r] / (right[r + 1] + left[j - r]);
            n_vals[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n_vals[j] = saved;
    }
    n_vals
}

/// Basis functions and their derivatives up to order `n_ders` at `t`.
///
/// `result[k][j]` is the `k`-th derivative of `N[span - p + j]`. Orders above
/// the degree are zero.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::many_single_char_names)]
pub fn basis_derivatives(
    knots: &[f64],
    span: usize,
    t: f64,
    degree: usize,
    n_ders: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ders = vec![vec![0.0; p + 1]; n_ders + 1];
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;
    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = n_ders.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];
    for r in 0..=p {
        let (mut s1, mut s2) = (0usize, 1usize);
        a[0][0] = 1.0;
        for k in 1..=top {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p as isize - k as isize;
            if r >= k {
                a[s2][0] = a[s1][0] / ndu[(pk + 1) as usize][rk as usize];
                d = a[s2][0] * ndu[rk as usize][pk as usize];
            }
            let j1: isize = if rk >= -1 { 1 } else { -rk };
            let j2: isize = if r as isize - 1 <= pk {
                k as isize - 1
            } else {
                p as isize - r as isize
            };
            let mut j = j1;
            while j <= j2 {
                let ju = j as usize;
                a[s2][ju] = (a[s1][ju] - a[s1][ju - 1]) / ndu[(pk + 1) as usize][(rk + j) as usize];
                d += a[s2][ju] * ndu[(rk + j) as usize][pk as usize];
                j += 1;
            }
            if r as isize <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[(pk + 1) as usize][r];
                d += a[s2][k] * ndu[r][pk as usize];
            }
            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = to_f64(p);
    for k in 1..=top {
        for j in 0..=p {
            ders[k][j] *= factor;
        }
        factor *= to_f64(p - k);
    }
    ders
}

/// Clamped knot vector with uniformly spaced interior knots over `domain`.
#[must_use]
pub fn clamped_uniform(degree: usize, count: usize, domain: Interval) -> Vec<f64> {
    let interior = count - degree - 1;
    let mut knots = vec![domain.min; degree + 1];
    for j in 1..=interior {
        knots.push(domain.parameter_at(to_f64(j) / to_f64(interior + 1)));
    }
    knots.extend(std::iter::repeat(domain.max).take(degree + 1));
    knots
}

/// Knot vector for global interpolation through points at `params`
/// (averaging technique).
#[must_use]
pub fn averaged(params: &[f64], degree: usize) -> Vec<f64> {
    let n = params.len();
    let first = params[0];
    let last = params[n - 1];
    let mut knots = vec![first; degree + 1];
    for j in 1..n - degree {
        let sum: f64 = params[j..j + degree].iter().sum();
        knots.push(sum / to_f64(degree));
    }
    knots.extend(std::iter::repeat(last).take(degree + 1));
    knots
}

/// Knot vector for least-squares approximation of points at `params` by
/// `count` control points.
///
/// Places each interior knot so that every span contains at least one
/// parameter, which keeps the normal equations well posed.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn approximating(params: &[f64], degree: usize, count: usize) -> Vec<f64> {
    let m = params.len() - 1;
    let n = count - 1;
    let first = params[0];
    let last = params[m];
    let mut knots = vec![first; degree + 1];
    let d = to_f64(m + 1) / to_f64(n - degree + 1);
    for j in 1..=n - degree {
        let jd = to_f64(j) * d;
        let i = (jd.floor() as usize).clamp(1, m);
        let alpha = jd - to_f64(i);
        knots.push((1.0 - alpha) * params[i - 1] + alpha * params[i]);
    }
    knots.extend(std::iter::repeat(last).take(degree + 1));
    knots
}

/// Multiplicity of `t` in the knot vector, within `tol`.
#[must_use]
pub fn multiplicity(knots: &[f64], t: f64, tol: f64) -> usize {
    knots.iter().filter(|k| (**k - t).abs() <= tol).count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CUBIC: [f64; 9] = [0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0];

    #[test]
    fn partition_of_unity() {
        for i in 0..=20 {
            let t = to_f64(i) / 20.0;
            let span = find_span(&CUBIC, 3, 5, t);
            let b = basis_functions(&CUBIC, span, t, 3);
            let sum: f64 = b.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "t={t}");
        }
    }

    #[test]
    fn end_parameter_uses_last_span() {
        assert_eq!(find_span(&CUBIC, 3, 5, 1.0), 4);
        assert_eq!(find_span(&CUBIC, 3, 5, 0.0), 3);
        assert_eq!(find_span(&CUBIC, 3, 5, 1.5), 4);
    }

    #[test]
    fn derivatives_sum_to_zero() {
        let t = 0.3;
        let span = find_span(&CUBIC, 3, 5, t);
        let ders = basis_derivatives(&CUBIC, span, t, 3, 2);
        let s0: f64 = ders[0].iter().sum();
        let s1: f64 = ders[1].iter().sum();
        let s2: f64 = ders[2].iter().sum();
        assert!((s0 - 1.0).abs() < 1e-12);
        assert!(s1.abs() < 1e-10);
        assert!(s2.abs() < 1e-9);
    }

    #[test]
    fn derivatives_match_finite_difference() {
        let t = 0.7;
        let h = 1e-6;
        let span = find_span(&CUBIC, 3, 5, t);
        let ders = basis_derivatives(&CUBIC, span, t, 3, 1);
        let b0 = basis_functions(&CUBIC, span, t - h, 3);
        let b1 = basis_functions(&CUBIC, span, t + h, 3);
        for j in 0..4 {
            let fd = (b1[j] - b0[j]) / (2.0 * h);
            assert!((fd - ders[1][j]).abs() < 1e-6, "j={j}");
        }
    }

    #[test]
    fn clamped_uniform_shape() {
        let k = clamped_uniform(3, 6, Interval::new(0.0, 3.0));
        assert_eq!(k, vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0, 3.0]);
        validate(&k, 3, 6).unwrap();
    }

    #[test]
    fn validate_rejects_bad_length() {
        assert!(validate(&[0.0, 1.0], 1, 2).is_err());
    }

    #[test]
    fn approximating_is_valid() {
        let params: Vec<f64> = (0..=50).map(|i| to_f64(i) / 50.0).collect();
        let k = approximating(&params, 3, 10);
        validate(&k, 3, 10).unwrap();
    }
}
