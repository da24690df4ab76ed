use tracing::debug;

use crate::config::SimplifyParams;
use crate::error::Result;
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::Surface;
use crate::operations::outcome::HealResult;
use crate::tessellation::TessellationParams;

use super::CurveDeviation;

/// Raises the control-point count of a curve to at least `desired`.
///
/// Counts `desired * m` are tried for each multiplier `m`; the first rebuild
/// within `complexify_max_deviation` of the original wins.
pub struct ComplexifyCurve<'a> {
    curve: &'a NurbsCurve,
    desired: usize,
    surface: Option<&'a dyn Surface>,
    params: SimplifyParams,
}

impl<'a> ComplexifyCurve<'a> {
    /// Creates a new `ComplexifyCurve` operation asking for at least `desired` control points.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve, desired: usize) -> Self {
        Self {
            curve,
            desired,
            surface: None,
            params: SimplifyParams::default(),
        }
    }

    /// Surface a 2D curve lives on.
    #[must_use]
    pub fn with_surface(mut self, surface: &'a dyn Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: SimplifyParams) -> Self {
        self.params = params;
        self
    }

    /// # Errors
    ///
    /// Returns an error if a 2D curve has no surface or evaluation fails.
    pub fn execute(&self) -> Result<HealResult<NurbsCurve>> {
        if self.curve.control_point_count() >= self.desired {
            return Ok(HealResult::unchanged(self.curve.clone()));
        }
        let tess = TessellationParams {
            min_segments: self.params.min_segments,
            max_segments: self.params.max_segments,
            segments_per_unit: self.params.segments_per_unit,
        };
        let mut reasons = Vec::new();
        for &m in &self.params.complexify_multipliers {
            let count = self.desired * m.max(1);
            let bigger = match self.curve.rebuild(count, self.curve.degree()) {
                Ok(c) => c,
                Err(e) => {
                    reasons.push(format!("{count} control points: {e}"));
                    continue;
                }
            };
            let deviation = CurveDeviation::new(&bigger, self.curve)
                .on_optional_surface(self.surface)
                .with_params(tess)
                .corresponding()?;
            if deviation <= self.params.complexify_max_deviation {
                let result = HealResult::fixed(bigger, "rebuild", Some(deviation));
                return Ok(result.with_fail_reasons(reasons));
            }
            reasons.push(format!("{count} control points: deviation {deviation:.2e}"));
        }
        debug!(reasons = %reasons.join("; "), "complexify found no valid rebuild");
        Ok(HealResult::failed(self.curve.clone(), reasons))
    }
}
