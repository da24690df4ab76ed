use tracing::debug;

use crate::config::KinkParams;
use crate::error::Result;
use crate::geometry::curve::CurveEnd;
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::{NurbsSurface, Surface};
use crate::math::{to_f64, Point3};
use crate::operations::classify::Side;
use crate::operations::outcome::HealResult;

use super::{CurveKinkFind, CurveKinkRemove};

const DEFAULT_ISO_COUNT: usize = 5;
const ALONG_SAMPLES: usize = 60;
const VALIDATION_GRID: usize = 8;

/// A surface side whose iso-curves end in a kink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceKinkData {
    pub side: Side,
    /// Largest kink angle seen on this side, in degrees.
    pub angle_deviation: f64,
    /// Number of sampled iso-curves kinked at this side.
    pub iso_curves: usize,
}

/// Detects kinked sides of a NURBS surface by testing iso-curves.
pub struct SurfaceKinkFind<'a> {
    surface: &'a NurbsSurface,
    params: KinkParams,
    iso_count: usize,
}

impl<'a> SurfaceKinkFind<'a> {
    /// Creates a new `SurfaceKinkFind` query sampling five iso-curves per direction.
    #[must_use]
    pub fn new(surface: &'a NurbsSurface) -> Self {
        Self {
            surface,
            params: KinkParams::default(),
            iso_count: DEFAULT_ISO_COUNT,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: KinkParams) -> Self {
        self.params = params;
        self
    }

    /// Number of iso-curves sampled in each direction.
    #[must_use]
    pub fn with_iso_count(mut self, count: usize) -> Self {
        self.iso_count = count.max(1);
        self
    }

    /// Kinked sides in [`Side::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns an error if an iso-curve cannot be extracted.
    pub fn execute(&self) -> Result<Vec<SurfaceKinkData>> {
        let domain = self.surface.domain();
        let mut found: Vec<SurfaceKinkData> = Vec::new();
        for along in 0..2 {
            let across = domain.axis(1 - along);
            for k in 0..self.iso_count {
                let value = across.parameter_at((to_f64(k) + 0.5) / to_f64(self.iso_count));
                let iso = self.surface.iso_curve(along, value)?;
                for kink in CurveKinkFind::new(&iso).with_params(self.params).execute() {
                    let side = Side::from_axis(along, kink.end == CurveEnd::Start);
                    match found.iter_mut().find(|d| d.side == side) {
                        Some(d) => {
                            d.iso_curves += 1;
                            d.angle_deviation = d.angle_deviation.max(kink.angle_deviation);
                        }
                        None => found.push(SurfaceKinkData {
                            side,
                            angle_deviation: kink.angle_deviation,
                            iso_curves: 1,
                        }),
                    }
                }
            }
        }
        found.sort_by_key(|d| Side::ALL.iter().position(|s| *s == d.side));
        Ok(found)
    }
}

/// Removes kinks along the sides of a NURBS surface.
///
/// Iso-curves running into each kinked side are repaired with
/// [`CurveKinkRemove`], resampled, and the grid is interpolated again. The
/// rebuilt surface has the domain `[0, 1] x [0, 1]`.
pub struct SurfaceKinkRemove<'a> {
    surface: &'a NurbsSurface,
    params: KinkParams,
    iso_count: usize,
}

impl<'a> SurfaceKinkRemove<'a> {
    /// Creates a new `SurfaceKinkRemove` operation sampling five iso-curves per direction.
    #[must_use]
    pub fn new(surface: &'a NurbsSurface) -> Self {
        Self {
            surface,
            params: KinkParams::default(),
            iso_count: DEFAULT_ISO_COUNT,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: KinkParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_iso_count(mut self, count: usize) -> Self {
        self.iso_count = count.max(1);
        self
    }

    /// # Errors
    ///
    /// Returns an error if evaluation fails. A repair that cannot be
    /// validated is reported as a failed result.
    pub fn execute(&self) -> Result<HealResult<NurbsSurface>> {
        let kinks = SurfaceKinkFind::new(self.surface)
            .with_params(self.params)
            .with_iso_count(self.iso_count)
            .execute()?;
        if kinks.is_empty() {
            return Ok(HealResult::unchanged(self.surface.clone()));
        }
        let sides: Vec<Side> = kinks.iter().map(|k| k.side).collect();

        let mut current = self.surface.clone();
        let mut reasons = Vec::new();
        for along in 0..2 {
            let ends: Vec<CurveEnd> = sides
                .iter()
                .filter(|s| s.axis() == along)
                .map(|s| if s.is_low() { CurveEnd::Start } else { CurveEnd::End })
                .collect();
            if ends.is_empty() {
                continue;
            }
            match self.repair_direction(&current, along, &ends, &mut reasons)? {
                Some(s) => current = s,
                None => {
                    debug!(reasons = %reasons.join("; "), "surface kink removal failed");
                    return Ok(HealResult::failed(self.surface.clone(), reasons));
                }
            }
        }

        let deviation = self.deviation(&current)?;
        if deviation > self.params.max_deviation {
            let reason = format!(
                "surface deviates {deviation:.4}, limit {}",
                self.params.max_deviation
            );
            debug!(%reason, "surface kink removal rejected");
            return Ok(HealResult::failed(self.surface.clone(), vec![reason]));
        }
        let remaining = SurfaceKinkFind::new(&current)
            .with_params(self.params)
            .with_iso_count(self.iso_count)
            .execute()?;
        if remaining.iter().any(|k| sides.contains(&k.side)) {
            let reason = "surface is still kinked".to_string();
            debug!(%reason, "surface kink removal rejected");
            return Ok(HealResult::failed(self.surface.clone(), vec![reason]));
        }
        Ok(HealResult::fixed(current, "iso-curve repair", Some(deviation)))
    }

    /// Repairs every iso-curve running along `along` and re-interpolates.
    ///
    /// Returns `None` after pushing the reason to `reasons` when an
    /// iso-curve cannot be repaired.
    fn repair_direction(
        &self,
        surface: &NurbsSurface,
        along: usize,
        ends: &[CurveEnd],
        reasons: &mut Vec<String>,
    ) -> Result<Option<NurbsSurface>> {
        let across = 1 - along;
        let range = surface.domain().axis(across);
        let across_samples = (surface.count(across) * 2).max(6);

        let mut lines: Vec<Vec<Point3>> = Vec::with_capacity(across_samples + 1);
        for k in 0..=across_samples {
            let value = range.parameter_at(to_f64(k) / to_f64(across_samples));
            let iso = surface.iso_curve(along, value)?;
            let kinks: Vec<_> = CurveKinkFind::new(&iso)
                .with_params(self.params)
                .execute()
                .into_iter()
                .filter(|kink| ends.contains(&kink.end))
                .collect();
            let repaired = if kinks.is_empty() {
                iso
            } else {
                let r = CurveKinkRemove::new(&iso)
                    .with_kinks(kinks)
                    .with_params(self.params)
                    .execute();
                if !r.changed {
                    reasons.push(format!("iso-curve {k}: {}", r.fail_reason().unwrap_or_default()));
                    return Ok(None);
                }
                r.value
            };
            lines.push(resample(&repaired));
        }

        let rows = if along == 1 { lines } else { transpose(&lines) };
        Ok(Some(NurbsSurface::interpolate(&rows, [3, 3])?))
    }

    /// Largest distance from the original surface, away from the kink bands,
    /// to the repaired one.
    fn deviation(&self, repaired: &NurbsSurface) -> Result<f64> {
        let d = self.surface.domain();
        let band = self.params.band;
        let mut worst: f64 = 0.0;
        for i in 0..=VALIDATION_GRID {
            for j in 0..=VALIDATION_GRID {
                let fu = band + (1.0 - 2.0 * band) * to_f64(i) / to_f64(VALIDATION_GRID);
                let fv = band + (1.0 - 2.0 * band) * to_f64(j) / to_f64(VALIDATION_GRID);
                let p = self.surface.evaluate(d.u.parameter_at(fu), d.v.parameter_at(fv))?;
                let q = repaired.closest_point(&p)?;
                worst = worst.max((repaired.point_at(&q)? - p).norm());
            }
        }
        Ok(worst)
    }
}

fn resample(curve: &NurbsCurve) -> Vec<Point3> {
    curve
        .uniform_parameters(ALONG_SAMPLES)
        .iter()
        .map(|t| curve.point_at(*t))
        .collect()
}

fn transpose(lines: &[Vec<Point3>]) -> Vec<Vec<Point3>> {
    let n = lines.first().map_or(0, Vec::len);
    (0..n).map(|i| lines.iter().map(|l| l[i]).collect()).collect()
}
