//! Singularity pass: points near a pole whose free coordinate is unreliable.
//!
//! Along a singular side every value of the other axis maps to the same 3D
//! point, so projections land on arbitrary values there. The pass restores
//! a value consistent with the neighbouring points, either by searching for
//! the parameters that reproduce the reference curve or by extrapolating
//! from trusted neighbours.

use crate::config::PointFixParams;
use crate::error::Result;
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::{Surface, SurfaceDomain, SurfacePoint};
use crate::math::{to_f64, Point3};
use crate::operations::classify::{SingularBand, SurfaceSingulars};

/// Inputs shared by the forward and backward scans.
pub(super) struct SingularPass<'a> {
    pub surface: &'a dyn Surface,
    pub singulars: &'a SurfaceSingulars,
    pub reference: Option<&'a NurbsCurve>,
    pub params: &'a PointFixParams,
}

/// Last points seen off the poles, oldest first.
#[derive(Default)]
struct History {
    trusted: Vec<(usize, SurfacePoint)>,
    in_band: bool,
}

impl History {
    fn push(&mut self, index: usize, point: SurfacePoint) {
        if self.in_band {
            self.trusted.clear();
            self.in_band = false;
        }
        self.trusted.push((index, point));
        if self.trusted.len() > 3 {
            self.trusted.remove(0);
        }
    }

    /// Linear prediction of the point at `index` from the trusted points.
    fn predict(&self, index: usize) -> Option<SurfacePoint> {
        let (i_first, first) = *self.trusted.first()?;
        let (i_last, last) = *self.trusted.last()?;
        if i_first == i_last {
            return None;
        }
        let span = to_f64(i_last.abs_diff(i_first));
        let ahead = to_f64(index.abs_diff(i_last));
        let mut predicted = last;
        for axis in 0..2 {
            let slope = (last[axis] - first[axis]) / span;
            predicted[axis] = last[axis] + slope * ahead;
        }
        Some(predicted)
    }
}

impl SingularPass<'_> {
    /// Runs the forward scan, then a backward scan for the leading points
    /// that had no history. Returns the number of points changed.
    ///
    /// # Errors
    ///
    /// Returns an error if surface evaluation fails.
    pub fn run(&self, points: &mut [SurfacePoint]) -> Result<usize> {
        let n = points.len();
        let mut fixed = vec![false; n];
        let mut count = self.scan(points, 0..n, &mut fixed)?;
        count += self.scan(points, (0..n).rev(), &mut fixed)?;
        Ok(count)
    }

    fn scan(
        &self,
        points: &mut [SurfacePoint],
        order: impl Iterator<Item = usize>,
        fixed: &mut [bool],
    ) -> Result<usize> {
        let mut history = History::default();
        let mut count = 0;
        for i in order {
            let point = points[i];
            let Some(side) = self.singulars.near_singular_side(&point, SingularBand::Close) else {
                history.push(i, point);
                continue;
            };
            history.in_band = true;
            if fixed[i] || history.trusted.len() < self.params.min_history {
                continue;
            }
            let Some(predicted) = history.predict(i) else {
                continue;
            };
            let axis = side.axis();
            let free = 1 - axis;
            let domain = self.singulars.domain();

            let candidate = if let Some(reference) = self.reference {
                let mut start = point;
                start[free] = predicted[free];
                domain.clamp(&mut start);
                self.search_reference(reference, point, start, domain)?
            } else {
                let almost = self.singulars.is_near(side, &point, SingularBand::Almost);
                let jump = (predicted[free] - point[free]).abs()
                    > self.singulars.band(free, SingularBand::HighJump);
                if !(almost || jump) {
                    continue;
                }
                let mut c = point;
                c[free] = predicted[free];
                domain.clamp(&mut c);
                Some(c)
            };

            if let Some(c) = candidate {
                if c != point {
                    tracing::trace!(
                        index = i,
                        from = ?point,
                        to = ?c,
                        "corrected point near singular side"
                    );
                    points[i] = c;
                    fixed[i] = true;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Searches for parameters reproducing the reference curve near `point`.
    ///
    /// Returns `None` unless the result is closer to the reference than
    /// `point` itself.
    fn search_reference(
        &self,
        reference: &NurbsCurve,
        point: SurfacePoint,
        start: SurfacePoint,
        domain: &SurfaceDomain,
    ) -> Result<Option<SurfacePoint>> {
        let image = self.surface.point_at(&point)?;
        let target = reference.point_at(reference.closest_point(&image));
        let before = (image - target).norm();
        if before <= self.params.search_tolerance {
            return Ok(None);
        }

        let (mut best, mut dist) = self.fast_search(&target, start, domain)?;
        if dist > self.params.search_tolerance {
            (best, dist) = self.slow_search(&target, best, dist, domain)?;
        }
        Ok((dist < before).then_some(best))
    }

    /// Pattern search halving its step whenever no direction improves.
    fn fast_search(
        &self,
        target: &Point3,
        start: SurfacePoint,
        domain: &SurfaceDomain,
    ) -> Result<(SurfacePoint, f64)> {
        let lengths = [domain.u.length(), domain.v.length()];
        let mut best = start;
        let mut dist = (self.surface.point_at(&best)? - target).norm();
        let mut step = self.params.search_fast_step;
        for _ in 0..self.params.search_max_iterations {
            if dist <= self.params.search_tolerance || step < self.params.search_min_step {
                break;
            }
            match self.best_neighbor(target, best, dist, step, lengths, domain)? {
                Some((p, d)) => {
                    best = p;
                    dist = d;
                }
                None => step *= 0.5,
            }
        }
        Ok((best, dist))
    }

    /// Fixed tiny-step search, run when the fast search stalls above tolerance.
    fn slow_search(
        &self,
        target: &Point3,
        start: SurfacePoint,
        start_dist: f64,
        domain: &SurfaceDomain,
    ) -> Result<(SurfacePoint, f64)> {
        let lengths = [domain.u.length(), domain.v.length()];
        let (mut best, mut dist) = (start, start_dist);
        for _ in 0..self.params.search_max_iterations {
            if dist <= self.params.search_tolerance {
                break;
            }
            let step = self.params.search_slow_step;
            match self.best_neighbor(target, best, dist, step, lengths, domain)? {
                Some((p, d)) => {
                    best = p;
                    dist = d;
                }
                None => break,
            }
        }
        Ok((best, dist))
    }

    fn best_neighbor(
        &self,
        target: &Point3,
        center: SurfacePoint,
        center_dist: f64,
        step: f64,
        lengths: [f64; 2],
        domain: &SurfaceDomain,
    ) -> Result<Option<(SurfacePoint, f64)>> {
        let mut best: Option<(SurfacePoint, f64)> = None;
        for axis in 0..2 {
            for sign in [-1.0, 1.0] {
                let mut p = center;
                p[axis] += sign * step * lengths[axis];
                domain.clamp(&mut p);
                let d = (self.surface.point_at(&p)? - target).norm();
                if d < best.map_or(center_dist, |b| b.1) {
                    best = Some((p, d));
                }
            }
        }
        Ok(best)
    }
}
