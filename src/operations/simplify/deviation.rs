use crate::error::Result;
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::surface::Surface;
use crate::tessellation::{Polyline, TessellateCurve, TessellationParams};

/// Measures how far one curve strays from another in 3D.
///
/// Both curves are sampled at the same number of equal parameter steps,
/// with the resolution taken from the first curve's 3D length unless
/// [`with_segments`](Self::with_segments) fixes it. 2D curves are mapped
/// through the surface.
pub struct CurveDeviation<'a> {
    first: &'a NurbsCurve,
    second: &'a NurbsCurve,
    surface: Option<&'a dyn Surface>,
    params: TessellationParams,
    segments: Option<usize>,
}

impl<'a> CurveDeviation<'a> {
    /// Creates a new `CurveDeviation` query measuring `second` against `first`.
    #[must_use]
    pub fn new(first: &'a NurbsCurve, second: &'a NurbsCurve) -> Self {
        Self {
            first,
            second,
            surface: None,
            params: TessellationParams::default(),
            segments: None,
        }
    }

    #[must_use]
    pub fn on_surface(mut self, surface: &'a dyn Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    #[must_use]
    pub fn on_optional_surface(mut self, surface: Option<&'a dyn Surface>) -> Self {
        self.surface = surface;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: TessellationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = Some(segments.max(1));
        self
    }

    /// Largest distance between samples taken at the same domain fraction.
    ///
    /// # Errors
    ///
    /// Returns an error if a 2D curve has no surface or evaluation fails.
    pub fn corresponding(&self) -> Result<f64> {
        let (a, b) = self.sample_both()?;
        Ok(a.max_pairwise_distance(&b))
    }

    /// Largest distance from a sample of either curve to the other polyline.
    ///
    /// Insensitive to parameterization.
    ///
    /// # Errors
    ///
    /// Returns an error if a 2D curve has no surface or evaluation fails.
    pub fn two_sided(&self) -> Result<f64> {
        let (a, b) = self.sample_both()?;
        Ok(a.max_distance_between(&b))
    }

    fn sample_both(&self) -> Result<(Polyline, Polyline)> {
        let a = match self.segments {
            Some(n) => self.sample(self.first).with_segments(n).execute()?,
            None => self.sample(self.first).execute()?,
        };
        let n = a.points.len().saturating_sub(1).max(1);
        let b = self.sample(self.second).with_segments(n).execute()?;
        Ok((a, b))
    }

    fn sample(&self, curve: &'a NurbsCurve) -> TessellateCurve<'a> {
        TessellateCurve::new(curve, self.params).on_optional_surface(self.surface)
    }
}
