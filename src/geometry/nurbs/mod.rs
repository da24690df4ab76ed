//! NURBS curves: evaluation, fitting, editing and extension.

mod curve;
mod edit;
mod extend;
mod fit;
pub mod knots;

pub use curve::{ArcLengthTable, NurbsCurve};
pub use fit::{chord_parameters, dedup_points};
