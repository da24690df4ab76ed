mod angle;
mod interval;

pub use angle::{angle_between, angle_between_deg, turning_angle};
pub use interval::Interval;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Distance between two points.
#[must_use]
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    (a - b).norm()
}

/// Converts a usize count or index to `f64`.
///
/// Counts in this crate stay far below 2^52, so the conversion is exact.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_f64(n: usize) -> f64 {
    n as f64
}
