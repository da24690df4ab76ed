//! Zig-zag deformations: control points folded back past their neighbours.

mod remove;

pub use remove::{ZigZagRemove, ZigZagStrategy};

use crate::config::ZigZagParams;
use crate::error::{OperationError, Result};
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::{Surface, SurfacePoint};
use crate::math::{distance, Point3};

/// Indices of interior points that are not between their neighbours.
///
/// Point `i` is flagged when the distance to either neighbour exceeds the
/// direct distance between the two neighbours. Returns `None` when nothing
/// is flagged.
#[must_use]
pub fn find_zigzag_indices(points: &[Point3]) -> Option<Vec<usize>> {
    let flagged: Vec<usize> = points
        .windows(3)
        .enumerate()
        .filter(|(_, w)| {
            let direct = distance(&w[0], &w[2]);
            distance(&w[0], &w[1]) > direct || distance(&w[1], &w[2]) > direct
        })
        .map(|(i, _)| i + 1)
        .collect();
    (!flagged.is_empty()).then_some(flagged)
}

/// Control points of `curve` in 3D, mapped through `surface` for 2D curves.
pub(crate) fn control_points_3d(
    curve: &NurbsCurve,
    surface: Option<&dyn Surface>,
) -> Result<Vec<Point3>> {
    match (curve.dimension(), surface) {
        (2, Some(s)) => curve
            .control_points()
            .iter()
            .map(|p| s.point_at(&SurfacePoint::from_point3(p)))
            .collect(),
        (2, None) => Err(OperationError::InvalidInput(
            "a 2D curve needs a surface to find zig-zags".into(),
        )
        .into()),
        _ => Ok(curve.control_points().to_vec()),
    }
}

/// Finds zig-zags in the control polygon of a curve.
///
/// Curves of degree 1 and 2 never carry the artifact and report nothing.
pub struct ZigZagFind<'a> {
    curve: &'a NurbsCurve,
    surface: Option<&'a dyn Surface>,
}

impl<'a> ZigZagFind<'a> {
    /// Creates a new `ZigZagFind` query.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve) -> Self {
        Self { curve, surface: None }
    }

    /// Surface a 2D curve lives on.
    #[must_use]
    pub fn with_surface(mut self, surface: &'a dyn Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Sorted flagged control-point indices, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] for a 2D curve without a
    /// surface, or an error if surface evaluation fails.
    pub fn execute(&self) -> Result<Option<Vec<usize>>> {
        if self.curve.degree() <= 2 {
            return Ok(None);
        }
        let points = control_points_3d(self.curve, self.surface)?;
        Ok(find_zigzag_indices(&points))
    }
}

/// A contiguous run of defective control points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZigZagDiapason {
    /// First control point of the padded run.
    pub start: usize,
    /// Last control point of the padded run.
    pub end: usize,
    /// Curve parameter closest to the control point at `start`.
    pub t_start: f64,
    /// Curve parameter closest to the control point at `end`.
    pub t_end: f64,
}

impl ZigZagDiapason {
    /// Returns true if `t` falls within the diapason grown by `margin`.
    #[must_use]
    pub fn covers(&self, t: f64, margin: f64) -> bool {
        t >= self.t_start - margin && t <= self.t_end + margin
    }
}

/// Groups flagged indices into diapasons with the default merge gap.
#[must_use]
pub fn group_diapasons(curve: &NurbsCurve, indices: &[usize]) -> Vec<ZigZagDiapason> {
    group_with_gap(curve, indices, ZigZagParams::default().merge_gap)
}

/// Merges indices at most `merge_gap` positions apart, pads each run by one
/// control point on both sides and locates it on the curve.
pub(crate) fn group_with_gap(
    curve: &NurbsCurve,
    indices: &[usize],
    merge_gap: usize,
) -> Vec<ZigZagDiapason> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<(usize, usize)> = Vec::new();
    for i in sorted {
        match runs.last_mut() {
            Some((_, end)) if i - *end <= merge_gap + 1 => *end = i,
            _ => runs.push((i, i)),
        }
    }

    let last = curve.control_point_count().saturating_sub(1);
    let cps = curve.control_points();
    runs.into_iter()
        .map(|(s, e)| {
            let start = s.saturating_sub(1);
            let end = (e + 1).min(last);
            let mut t_start = curve.closest_point(&cps[start]);
            let mut t_end = curve.closest_point(&cps[end]);
            if t_start > t_end {
                std::mem::swap(&mut t_start, &mut t_end);
            }
            ZigZagDiapason {
                start,
                end,
                t_start,
                t_end,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::Plane;
    use crate::geometry::surface::SurfaceDomain;
    use crate::math::{Interval, Vector3};

    fn zigzag_curve() -> NurbsCurve {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.5, 0.2, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
        ];
        NurbsCurve::from_control_points(3, 3, &pts).unwrap()
    }

    #[test]
    fn straight_points_have_no_zigzag() {
        let pts: Vec<Point3> = (0..5_u32).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect();
        assert!(find_zigzag_indices(&pts).is_none());
    }

    #[test]
    fn folded_point_is_flagged() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(3.0, 0.1, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let idx = find_zigzag_indices(&pts).unwrap();
        assert!(idx.contains(&2));
    }

    #[test]
    fn displaced_control_point_found() {
        let idx = ZigZagFind::new(&zigzag_curve()).execute().unwrap().unwrap();
        assert!(idx.contains(&3));
    }

    #[test]
    fn linear_curve_is_exempt() {
        let line = NurbsCurve::line(3, Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(ZigZagFind::new(&line).execute().unwrap().is_none());
    }

    #[test]
    fn quadratic_curve_is_exempt() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let c = NurbsCurve::from_control_points(3, 2, &pts).unwrap();
        assert!(ZigZagFind::new(&c).execute().unwrap().is_none());
    }

    #[test]
    fn two_dimensional_curve_needs_surface() {
        let pts: Vec<Point3> = (0..5_u32)
            .map(|i| Point3::new(0.1 * f64::from(i), 0.5, 0.0))
            .collect();
        let c = NurbsCurve::from_control_points(2, 3, &pts).unwrap();
        assert!(ZigZagFind::new(&c).execute().is_err());
        let plane = Plane::new(
            Point3::origin(),
            Vector3::x(),
            Vector3::y(),
            SurfaceDomain::new(Interval::new(0.0, 1.0), Interval::new(0.0, 1.0)),
        )
        .unwrap();
        assert!(ZigZagFind::new(&c).with_surface(&plane).execute().unwrap().is_none());
    }

    #[test]
    fn groups_merge_and_pad() {
        let c = zigzag_curve();
        let groups = group_diapasons(&c, &[2, 3, 5]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].start, 1);
        assert_eq!(groups[0].end, 6);
        assert!(groups[0].t_start <= groups[0].t_end);

        let apart = group_diapasons(&c, &[1, 5]);
        assert_eq!(apart.len(), 2);
        assert_eq!((apart[0].start, apart[0].end), (0, 2));
    }
}
