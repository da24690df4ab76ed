//! Curve extension by length or to a point.

use crate::error::{GeometryError, Result};
use crate::geometry::curve::{Arc, CurveEnd, ExtendStyle};
use crate::math::{to_f64, Interval, Point3, Vector3, TOLERANCE};

use super::NurbsCurve;

/// Junction tolerance used when joining an extension piece.
const JOIN_TOLERANCE: f64 = 1e-9;

impl NurbsCurve {
    /// Extends the curve at `end` by `length` using `style`.
    ///
    /// The existing part keeps its parameterization; the domain grows past
    /// the extended end.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` is not positive or the curve has no
    /// tangent at that end.
    pub fn extend_by_length(&self, end: CurveEnd, length: f64, style: ExtendStyle) -> Result<Self> {
        if length <= 0.0 || !length.is_finite() {
            return Err(GeometryError::Degenerate(format!(
                "extension length {length} must be positive"
            ))
            .into());
        }
        match end {
            CurveEnd::End => self.extend_end_by_length(length, style),
            CurveEnd::Start => Ok(self.reverse().extend_end_by_length(length, style)?.reverse()),
        }
    }

    /// Extends the curve at `end` so that it finishes at `target`.
    ///
    /// `Line` appends a straight segment to `target`; `Arc` appends the
    /// tangent arc through `target` (a line if `target` is on the tangent);
    /// `Smooth` continues the end polynomial and bends it onto `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` coincides with the end point or the
    /// curve has no tangent there.
    pub fn extend_to_point(
        &self,
        end: CurveEnd,
        target: Point3,
        style: ExtendStyle,
    ) -> Result<Self> {
        match end {
            CurveEnd::End => self.extend_end_to_point(target, style),
            CurveEnd::Start => Ok(self.reverse().extend_end_to_point(target, style)?.reverse()),
        }
    }

    fn end_tangent(&self) -> Result<Vector3> {
        let t = self.tangent_at(self.domain().max);
        if t.norm() < 0.5 {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(t)
    }

    fn extend_end_by_length(&self, length: f64, style: ExtendStyle) -> Result<Self> {
        let end = self.end_point();
        let tangent = self.end_tangent()?;
        let piece = match style {
            ExtendStyle::Line => self.line_piece(end, end + tangent * length)?,
            ExtendStyle::Arc => {
                let k = self.curvature_at(self.domain().max);
                if k.norm() < 1e-9 {
                    self.line_piece(end, end + tangent * length)?
                } else {
                    let arc = Arc::from_curvature(end, tangent, k, 1.0 / k.norm(), length)?;
                    NurbsCurve::from_arc(self.dimension(), &arc)?
                }
            }
            ExtendStyle::Smooth => self.smooth_piece_by_length(length)?,
        };
        self.join(&piece, JOIN_TOLERANCE)
    }

    fn extend_end_to_point(&self, target: Point3, style: ExtendStyle) -> Result<Self> {
        let end = self.end_point();
        if (target - end).norm() < TOLERANCE {
            return Err(
                GeometryError::Degenerate("extension target is the curve end".into()).into(),
            );
        }
        let piece = match style {
            ExtendStyle::Line => self.line_piece(end, target)?,
            ExtendStyle::Arc => {
                let tangent = self.end_tangent()?;
                match Arc::tangent_to_point(end, tangent, target)? {
                    Some(arc) => NurbsCurve::from_arc(self.dimension(), &arc)?,
                    None => self.line_piece(end, target)?,
                }
            }
            ExtendStyle::Smooth => self.smooth_piece_to_point(target)?,
        };
        self.join(&piece, JOIN_TOLERANCE)
    }

    /// Straight piece with evenly spaced control points at this curve's degree.
    fn line_piece(&self, a: Point3, b: Point3) -> Result<Self> {
        let p = self.degree();
        let points: Vec<Point3> = (0..=p).map(|i| a + (b - a) * (to_f64(i) / to_f64(p))).collect();
        NurbsCurve::from_control_points(self.dimension(), p, &points)
    }

    /// Continuation of the last span's polynomial over `[t_end, t_end + dt]`.
    fn polynomial_piece(&self, dt: f64) -> Result<Self> {
        let p = self.degree();
        let t_end = self.domain().max;
        let params: Vec<f64> = (0..=p).map(|i| t_end + dt * to_f64(i) / to_f64(p)).collect();
        let points: Vec<Point3> = params.iter().map(|t| self.point_at(*t)).collect();
        let mut piece =
            NurbsCurve::interpolate_with_parameters(self.dimension(), p, &points, &params)?;
        piece.set_control_point(0, self.end_point());
        Ok(piece)
    }

    fn end_speed(&self) -> Result<f64> {
        let speed = self.derivatives_at(self.domain().max, 1)[1].norm();
        if speed < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(speed)
    }

    fn smooth_piece_by_length(&self, length: f64) -> Result<Self> {
        let mut dt = length / self.end_speed()?;
        let mut piece = self.polynomial_piece(dt)?;
        for _ in 0..8 {
            let got = piece.length();
            if got < TOLERANCE || (got - length).abs() <= length * 1e-6 {
                break;
            }
            dt *= length / got;
            piece = self.polynomial_piece(dt)?;
        }
        Ok(piece)
    }

    fn smooth_piece_to_point(&self, target: Point3) -> Result<Self> {
        let end = self.end_point();
        let tangent = self.end_tangent()?;
        let chord = target - end;
        let reach = chord.dot(&tangent).max(chord.norm() * 0.5);
        let trial = self.polynomial_piece(2.0 * reach / self.end_speed()?)?;
        let s = trial.closest_point(&target);
        let dt = (s - trial.domain().min).max(trial.domain().length() * 0.05);
        let piece = self.polynomial_piece(dt)?;

        // Bend the piece onto the target with a shift growing linearly from the junction.
        let offset = target - piece.end_point();
        let p = piece.degree();
        let bent: Vec<Point3> = piece
            .control_points()
            .iter()
            .enumerate()
            .map(|(i, cp)| cp + offset * (to_f64(i) / to_f64(p)))
            .collect();
        let bent = piece.with_control_points(bent)?;
        Ok(bent.with_domain(Interval::new(0.0, 1.0)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arc_curve() -> NurbsCurve {
        let pts: Vec<Point3> = (0..=10)
            .map(|i| {
                let a = to_f64(i) * 0.1;
                Point3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        NurbsCurve::interpolate(3, 3, &pts).unwrap()
    }

    #[test]
    fn line_extension_by_length() {
        let c = NurbsCurve::from_control_points(
            3,
            3,
            &[
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
            ],
        )
        .unwrap();
        let e = c.extend_by_length(CurveEnd::End, 1.0, ExtendStyle::Line).unwrap();
        assert!((e.end_point() - Point3::new(4.0, 0.0, 0.0)).norm() < 1e-9);
        assert_relative_eq!(e.length(), 4.0, epsilon = 1e-6);
        // The original part keeps its parameters.
        assert!((e.point_at(0.5) - c.point_at(0.5)).norm() < 1e-9);
    }

    #[test]
    fn start_extension_prepends() {
        let c = NurbsCurve::line(3, Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap();
        let e = c.extend_by_length(CurveEnd::Start, 0.5, ExtendStyle::Line).unwrap();
        assert!((e.start_point() - Point3::new(-0.5, 0.0, 0.0)).norm() < 1e-9);
        assert!((e.end_point() - c.end_point()).norm() < 1e-9);
    }

    #[test]
    fn arc_extension_keeps_radius() {
        let c = arc_curve();
        let e = c.extend_by_length(CurveEnd::End, 0.5, ExtendStyle::Arc).unwrap();
        assert_relative_eq!(e.end_point().coords.norm(), 1.0, epsilon = 1e-2);
        assert_relative_eq!(e.length(), c.length() + 0.5, epsilon = 1e-3);
    }

    #[test]
    fn smooth_extension_by_length() {
        let c = arc_curve();
        let e = c.extend_by_length(CurveEnd::End, 0.3, ExtendStyle::Smooth).unwrap();
        assert_relative_eq!(e.length(), c.length() + 0.3, epsilon = 1e-4);
    }

    #[test]
    fn extension_to_point_reaches_target() {
        let c = arc_curve();
        let target = Point3::new(0.2, 1.2, 0.0);
        for style in [ExtendStyle::Line, ExtendStyle::Arc, ExtendStyle::Smooth] {
            let e = c.extend_to_point(CurveEnd::End, target, style).unwrap();
            assert!((e.end_point() - target).norm() < 1e-9, "{style:?}");
            assert!((e.start_point() - c.start_point()).norm() < 1e-9);
        }
    }

    #[test]
    fn rejects_non_positive_length() {
        let c = arc_curve();
        assert!(c.extend_by_length(CurveEnd::End, 0.0, ExtendStyle::Line).is_err());
    }
}
