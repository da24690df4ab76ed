//! Seam pass: points that landed on the wrong side of a periodic seam.

use crate::geometry::surface::{SurfaceDomain, SurfacePoint};
use crate::operations::classify::SurfaceSeams;

/// Scans the points in `order` and snaps seam points that jump by more than
/// half a period away from the last trusted value. Returns the number of
/// points moved.
fn scan(
    points: &mut [SurfacePoint],
    order: impl Iterator<Item = usize>,
    axis: usize,
    domain: &SurfaceDomain,
    band: f64,
    min_trusted_run: usize,
) -> usize {
    let range = domain.axis(axis);
    let period = range.length();
    let mut anchor: Option<f64> = None;
    let mut run = 0usize;
    let mut fixes = 0;

    for i in order {
        let value = points[i][axis];
        let on_seam = range.distance_to_bound(value) <= band;
        if !on_seam {
            anchor = Some(value);
            run += 1;
            continue;
        }
        let Some(prev) = anchor else { continue };
        if run < min_trusted_run || (value - prev).abs() <= period * 0.5 {
            continue;
        }
        let wraps = ((value - prev) / period).round();
        let snapped = range.clamp(value - wraps * period);
        #[allow(clippy::float_cmp)]
        if snapped != value {
            points[i][axis] = snapped;
            fixes += 1;
        }
    }
    fixes
}

/// Runs the forward and backward seam scans on every wrapping axis.
pub(super) fn fix_seams(
    points: &mut [SurfacePoint],
    seams: &SurfaceSeams,
    band_fraction: f64,
    min_trusted_run: usize,
) -> usize {
    let domain = *seams.domain();
    let n = points.len();
    let mut fixes = 0;
    for axis in 0..2 {
        if !seams.has_seam(axis) {
            continue;
        }
        let band = band_fraction * domain.axis(axis).length();
        fixes += scan(points, 0..n, axis, &domain, band, min_trusted_run);
        fixes += scan(points, (0..n).rev(), axis, &domain, band, min_trusted_run);
    }
    fixes
}

/// Snaps the end point at `index` exactly onto the seam bound nearest to
/// its neighbour at `neighbor`, when it lies within the seam band.
pub(super) fn round_end(
    points: &mut [SurfacePoint],
    index: usize,
    neighbor: usize,
    seams: &SurfaceSeams,
    band_fraction: f64,
) -> bool {
    let domain = *seams.domain();
    let mut moved = false;
    for axis in 0..2 {
        if !seams.has_seam(axis) {
            continue;
        }
        let range = domain.axis(axis);
        let value = points[index][axis];
        if range.distance_to_bound(value) > band_fraction * range.length() {
            continue;
        }
        let next = points[neighbor][axis];
        let bound = if (next - range.min).abs() <= (next - range.max).abs() {
            range.min
        } else {
            range.max
        };
        #[allow(clippy::float_cmp)]
        if bound != value {
            points[index][axis] = bound;
            moved = true;
        }
    }
    moved
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::Cylinder;
    use crate::math::{Interval, Point3, Vector3};
    use std::f64::consts::TAU;

    fn seams() -> SurfaceSeams {
        let c = Cylinder::new(
            Point3::origin(),
            1.0,
            Vector3::z(),
            Vector3::x(),
            Interval::new(0.0, 1.0),
        )
        .unwrap();
        SurfaceSeams::compute(&c).unwrap()
    }

    #[test]
    fn point_on_wrong_seam_side_is_snapped() {
        let mut pts = vec![
            SurfacePoint::new(0.5, 0.0),
            SurfacePoint::new(0.3, 0.1),
            SurfacePoint::new(0.0, 0.2),
            SurfacePoint::new(TAU, 0.3),
        ];
        let fixes = fix_seams(&mut pts, &seams(), 0.01, 2);
        assert_eq!(fixes, 1);
        assert!(pts[3].u().abs() < 1e-12);
    }

    #[test]
    fn leading_point_fixed_by_backward_scan() {
        let mut pts = vec![
            SurfacePoint::new(TAU - 0.01, 0.0),
            SurfacePoint::new(0.2, 0.1),
            SurfacePoint::new(0.4, 0.2),
            SurfacePoint::new(0.6, 0.3),
        ];
        fix_seams(&mut pts, &seams(), 0.01, 2);
        assert!(pts[0].u().abs() < 1e-12);
    }

    #[test]
    fn short_history_is_not_trusted() {
        let mut pts = vec![SurfacePoint::new(0.3, 0.0), SurfacePoint::new(TAU, 0.1)];
        assert_eq!(fix_seams(&mut pts, &seams(), 0.01, 2), 0);
    }

    #[test]
    fn round_end_snaps_to_neighbor_side() {
        let mut pts = vec![SurfacePoint::new(TAU - 0.001, 0.0), SurfacePoint::new(TAU - 0.3, 0.1)];
        assert!(round_end(&mut pts, 0, 1, &seams(), 0.01));
        assert!((pts[0].u() - TAU).abs() < 1e-12);
    }
}
