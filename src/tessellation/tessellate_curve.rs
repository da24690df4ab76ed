use crate::error::{OperationError, Result};
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::{Surface, SurfacePoint};
use crate::math::to_f64;

use super::{Polyline, TessellationParams};

/// Samples a curve into a 3D polyline.
///
/// 2D curves are mapped through the surface given with [`on_surface`](Self::on_surface).
/// Vertices are taken at equal parameter steps, so polylines of two curves
/// with the same domain and segment count correspond vertex by vertex.
pub struct TessellateCurve<'a> {
    curve: &'a NurbsCurve,
    surface: Option<&'a dyn Surface>,
    params: TessellationParams,
    segments: Option<usize>,
}

impl<'a> TessellateCurve<'a> {
    /// Creates a new `TessellateCurve` operation.
    #[must_use]
    pub fn new(curve: &'a NurbsCurve, params: TessellationParams) -> Self {
        Self {
            curve,
            surface: None,
            params,
            segments: None,
        }
    }

    /// Maps parameter-space curves through `surface`.
    #[must_use]
    pub fn on_surface(mut self, surface: &'a dyn Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Like [`on_surface`](Self::on_surface), for callers that may not have one.
    #[must_use]
    pub fn on_optional_surface(mut self, surface: Option<&'a dyn Surface>) -> Self {
        self.surface = surface;
        self
    }

    /// Uses exactly `segments` segments instead of a length-based count.
    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = Some(segments.max(1));
        self
    }

    /// Executes the tessellation, returning a polyline.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] for a 2D curve without a
    /// surface, or an error if surface evaluation fails.
    pub fn execute(&self) -> Result<Polyline> {
        let segments = match self.segments {
            Some(n) => n,
            None => {
                let coarse = self.sample(32)?;
                self.params.segments_for_length(coarse.length())
            }
        };
        self.sample(segments)
    }

    fn sample(&self, segments: usize) -> Result<Polyline> {
        let domain = self.curve.domain();
        let params: Vec<f64> = (0..=segments)
            .map(|i| domain.parameter_at(to_f64(i) / to_f64(segments)))
            .collect();
        let points = match (self.curve.dimension(), self.surface) {
            (2, Some(surface)) => params
                .iter()
                .map(|t| surface.point_at(&SurfacePoint::from_point3(&self.curve.point_at(*t))))
                .collect::<Result<Vec<_>>>()?,
            (2, None) => {
                return Err(OperationError::InvalidInput(
                    "a 2D curve needs a surface to be sampled in 3D".into(),
                )
                .into())
            }
            _ => params.iter().map(|t| self.curve.point_at(*t)).collect(),
        };
        Ok(Polyline { points, params })
    }
}
