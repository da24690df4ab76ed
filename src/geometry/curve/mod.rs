mod arc;
mod line;

pub use arc::Arc;
pub use line::Line;

use crate::error::Result;
use crate::math::{Interval, Point3, Vector3};

/// One of the two ends of an open curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveEnd {
    Start,
    End,
}

impl CurveEnd {
    /// Both ends, start first.
    pub const BOTH: [CurveEnd; 2] = [CurveEnd::Start, CurveEnd::End];

    /// The opposite end.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            CurveEnd::Start => CurveEnd::End,
            CurveEnd::End => CurveEnd::Start,
        }
    }
}

/// Shape of the piece appended by a curve extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendStyle {
    /// Straight segment.
    Line,
    /// Circular arc, tangent to the curve at the extended end.
    Arc,
    /// Polynomial continuation of the last span.
    Smooth,
}

/// Trait for parametric curves in 3D space.
pub trait Curve {
    /// Evaluates the curve at parameter `t`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or evaluation fails.
    fn evaluate(&self, t: f64) -> Result<Point3>;

    /// Computes the unit tangent vector at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or the tangent is degenerate.
    fn tangent(&self, t: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> Interval;

    /// Returns whether the curve is closed.
    fn is_closed(&self) -> bool;

    /// Evaluates `count + 1` points at equal parameter steps over the domain.
    ///
    /// # Errors
    ///
    /// Returns an error if any evaluation fails.
    fn sample(&self, count: usize) -> Result<Vec<Point3>> {
        let domain = self.domain();
        let count = count.max(1);
        (0..=count)
            .map(|i| {
                let f = crate::math::to_f64(i) / crate::math::to_f64(count);
                self.evaluate(domain.parameter_at(f))
            })
            .collect()
    }
}
