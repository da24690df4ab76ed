//! End kinks: abrupt tangent changes right at a curve's ends.
//!
//! A kink is judged against the curve's own interior: the tangent change
//! over the last sampled segment is compared with the changes over the
//! neighbouring segments, so regular curvature is not mistaken for a kink.

mod remove;
mod surface;

pub use remove::{CurveKinkRemove, KinkStrategy};
pub use surface::{SurfaceKinkData, SurfaceKinkFind, SurfaceKinkRemove};

use crate::config::KinkParams;
use crate::geometry::curve::CurveEnd;
use crate::geometry::nurbs::{ArcLengthTable, NurbsCurve};
use crate::math::{angle_between_deg, to_f64, Vector3, TOLERANCE};

/// One kinked curve end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveKinkData {
    pub end: CurveEnd,
    /// Excess of the end tangent change over the local average, in degrees.
    pub angle_deviation: f64,
    /// Parameter where the kink band at this end begins.
    pub t_band: f64,
}

/// Detects kinks at the ends of a curve.
pub struct CurveKinkFind<'a> {
    curve: &'a NurbsCurve,
    params: KinkParams,
}

impl<'a> CurveKinkFind<'a> {
    /// Creates a new `CurveKinkFind` query.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve) -> Self {
        Self {
            curve,
            params: KinkParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: KinkParams) -> Self {
        self.params = params;
        self
    }

    /// Kinked ends, start first. Empty when the curve is kink-free.
    #[must_use]
    pub fn execute(&self) -> Vec<CurveKinkData> {
        let p = &self.params;
        let n = p.samples.max(4);
        let table = ArcLengthTable::new(self.curve, n * 20);
        if table.total() < TOLERANCE {
            return Vec::new();
        }
        let tangent_at_fraction = |f: f64| self.curve.tangent_at(table.parameter_at(f));
        let tangents: Vec<Vector3> = (0..=n)
            .map(|k| tangent_at_fraction(to_f64(k) / to_f64(n)))
            .collect();
        let changes: Vec<f64> = tangents
            .windows(2)
            .map(|w| angle_between_deg(&w[0], &w[1]))
            .collect();
        let q = p.quartile.clamp(1, n - 2);

        let mut kinks = Vec::new();
        for end in CurveEnd::BOTH {
            let (edge_tangent, inner_tangent, edge, local) = match end {
                CurveEnd::Start => (
                    tangents[0],
                    tangent_at_fraction(p.band),
                    changes[0],
                    &changes[1..=q],
                ),
                CurveEnd::End => (
                    tangents[n],
                    tangent_at_fraction(1.0 - p.band),
                    changes[n - 1],
                    &changes[n - 1 - q..n - 1],
                ),
            };
            if angle_between_deg(&edge_tangent, &inner_tangent) < p.fast_reject_deg {
                continue;
            }
            let average = local.iter().sum::<f64>() / to_f64(local.len());
            let spread = local.iter().map(|c| (c - average).abs()).fold(0.0, f64::max);
            let deviation = edge - average;
            if deviation > p.min_angle_deg && deviation > p.ratio * spread {
                let t_band = match end {
                    CurveEnd::Start => table.parameter_at(p.band),
                    CurveEnd::End => table.parameter_at(1.0 - p.band),
                };
                kinks.push(CurveKinkData {
                    end,
                    angle_deviation: deviation,
                    t_band,
                });
            }
        }
        kinks
    }
}

#[cfg(test)]
pub(crate) mod test_curves {
    #![allow(clippy::unwrap_used)]

    use crate::geometry::nurbs::NurbsCurve;
    use crate::math::{Point3, Vector3};

    /// A 10-unit straight cubic whose last 0.03 units turn by `degrees`.
    pub fn kinked_at_end(degrees: f64) -> NurbsCurve {
        let a = degrees.to_radians();
        let corner = Point3::new(10.0, 0.0, 0.0);
        let tip = corner + Vector3::new(a.cos(), a.sin(), 0.0) * 0.03;
        let main = NurbsCurve::line(3, Point3::origin(), corner).unwrap();
        let hook = NurbsCurve::line(3, corner, tip).unwrap();
        main.join(&hook, 1e-9).unwrap().elevate_degree(3)
    }

    /// A smooth cubic quarter-ish bend with no kink.
    pub fn smooth_bend() -> NurbsCurve {
        let pts: Vec<Point3> = (0..=20)
            .map(|i| {
                let a = crate::math::to_f64(i) / 20.0 * 1.2;
                Point3::new(3.0 * a.cos(), 3.0 * a.sin(), 0.0)
            })
            .collect();
        NurbsCurve::interpolate(3, 3, &pts).unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_curves::{kinked_at_end, smooth_bend};
    use super::*;

    #[test]
    fn straight_curve_has_no_kink() {
        let end = crate::math::Point3::new(5.0, 0.0, 0.0);
        let c = NurbsCurve::line(3, crate::math::Point3::origin(), end).unwrap();
        assert!(CurveKinkFind::new(&c).execute().is_empty());
    }

    #[test]
    fn regular_curvature_is_not_a_kink() {
        assert!(CurveKinkFind::new(&smooth_bend()).execute().is_empty());
    }

    #[test]
    fn hooked_end_is_found() {
        let c = kinked_at_end(20.0);
        let kinks = CurveKinkFind::new(&c).execute();
        assert_eq!(kinks.len(), 1);
        assert_eq!(kinks[0].end, CurveEnd::End);
        assert!((kinks[0].angle_deviation - 20.0).abs() < 0.5);
        assert!(kinks[0].t_band < c.domain().max);
    }

    #[test]
    fn small_hook_is_below_floor() {
        let c = kinked_at_end(3.0);
        assert!(CurveKinkFind::new(&c).execute().is_empty());
    }

    #[test]
    fn hooked_start_is_found() {
        let c = kinked_at_end(30.0).reverse();
        let kinks = CurveKinkFind::new(&c).execute();
        assert_eq!(kinks.len(), 1);
        assert_eq!(kinks[0].end, CurveEnd::Start);
    }
}
