use super::{Point3, Vector3, TOLERANCE};

/// Unsigned angle between two vectors in radians, in `[0, pi]`.
///
/// Uses the `atan2(|a x b|, a . b)` form, which stays accurate for nearly
/// parallel vectors. Returns `0.0` if either vector is degenerate.
#[must_use]
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    if a.norm() < TOLERANCE || b.norm() < TOLERANCE {
        return 0.0;
    }
    a.cross(b).norm().atan2(a.dot(b))
}

/// Unsigned angle between two vectors in degrees.
#[must_use]
pub fn angle_between_deg(a: &Vector3, b: &Vector3) -> f64 {
    angle_between(a, b).to_degrees()
}

/// Turning angle at `p1` when walking `p0 -> p1 -> p2`, in radians.
///
/// A straight continuation is `0`, a full fold-back is `pi`.
#[must_use]
pub fn turning_angle(p0: &Point3, p1: &Point3, p2: &Point3) -> f64 {
    angle_between(&(p1 - p0), &(p2 - p1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn perpendicular_vectors() {
        let a = angle_between(&Vector3::x(), &Vector3::y());
        assert!((a - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn opposite_vectors() {
        let a = angle_between(&Vector3::x(), &-Vector3::x());
        assert!((a - PI).abs() < 1e-12);
    }

    #[test]
    fn degenerate_vector_is_zero() {
        assert_eq!(angle_between(&Vector3::zeros(), &Vector3::x()), 0.0);
    }

    #[test]
    fn degrees() {
        let a = angle_between_deg(&Vector3::x(), &Vector3::new(1.0, 1.0, 0.0));
        assert!((a - 45.0).abs() < 1e-9);
    }

    #[test]
    fn turning_straight_and_foldback() {
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        assert!(turning_angle(&p0, &p1, &Point3::new(2.0, 0.0, 0.0)).abs() < 1e-12);
        assert!((turning_angle(&p0, &p1, &Point3::new(0.5, 0.0, 0.0)) - PI).abs() < 1e-12);
    }
}
