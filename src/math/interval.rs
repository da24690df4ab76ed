/// A closed 1D parameter interval `[min, max]`.
///
/// Used both as a curve domain and as one axis of a surface domain. All
/// percent-normalized parameter helpers (`parameter_at`, `fraction_of`)
/// live here so callers never re-derive them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Start of the range.
    pub min: f64,
    /// End of the range.
    pub max: f64,
}

impl Interval {
    /// Creates a new interval. The bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Smallest interval enclosing all finite `values`, or `None` if there are none.
    #[must_use]
    pub fn enclosing(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(i) => Some(Self {
                    min: i.min.min(v),
                    max: i.max.max(v),
                }),
            })
    }

    /// Length of the interval.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    /// Midpoint of the interval.
    #[must_use]
    pub fn mid(&self) -> f64 {
        self.min + 0.5 * self.length()
    }

    /// Returns true if `t` lies inside the interval, extended by `tol` on both ends.
    #[must_use]
    pub fn contains(&self, t: f64, tol: f64) -> bool {
        t >= self.min - tol && t <= self.max + tol
    }

    /// Clamps `t` into the interval.
    #[must_use]
    pub fn clamp(&self, t: f64) -> f64 {
        t.clamp(self.min, self.max)
    }

    /// Parameter at a normalized position: `0.0` is `min`, `1.0` is `max`.
    #[must_use]
    pub fn parameter_at(&self, fraction: f64) -> f64 {
        self.min + fraction * self.length()
    }

    /// Normalized position of `t` in the interval. Zero-length intervals map to `0.0`.
    #[must_use]
    pub fn fraction_of(&self, t: f64) -> f64 {
        let len = self.length();
        if len.abs() < f64::EPSILON {
            0.0
        } else {
            (t - self.min) / len
        }
    }

    /// Returns the interval grown by `amount` on both sides.
    #[must_use]
    pub fn grow(&self, amount: f64) -> Self {
        Self::new(self.min - amount, self.max + amount)
    }

    /// Distance from `t` to the nearer bound.
    #[must_use]
    pub fn distance_to_bound(&self, t: f64) -> f64 {
        (t - self.min).abs().min((self.max - t).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_orders_bounds() {
        let i = Interval::new(3.0, 1.0);
        assert_eq!(i.min, 1.0);
        assert_eq!(i.max, 3.0);
    }

    #[test]
    fn fraction_roundtrip() {
        let i = Interval::new(2.0, 6.0);
        assert!((i.parameter_at(0.25) - 3.0).abs() < 1e-12);
        assert!((i.fraction_of(5.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn zero_length_fraction() {
        let i = Interval::new(1.0, 1.0);
        assert_eq!(i.fraction_of(1.0), 0.0);
    }

    #[test]
    fn enclosing_skips_non_finite() {
        let i = Interval::enclosing([1.0, f64::NAN, -2.0, 4.0]).unwrap();
        assert_eq!(i, Interval::new(-2.0, 4.0));
        assert!(Interval::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn distance_to_nearer_bound() {
        let i = Interval::new(0.0, 10.0);
        assert!((i.distance_to_bound(9.5) - 0.5).abs() < 1e-12);
        assert!((i.distance_to_bound(-1.0) - 1.0).abs() < 1e-12);
    }
}
