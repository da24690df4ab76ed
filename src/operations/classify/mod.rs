//! Surface topology classification: singular sides and seams.

mod seams;
mod singulars;

pub use seams::SurfaceSeams;
pub use singulars::{SingularBand, SurfaceSingulars};

use crate::geometry::surface::SurfaceDomain;

/// One side of a surface's parameter rectangle.
///
/// West/East are the `u` bounds (axis 0), South/North the `v` bounds (axis 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    West,
    East,
    South,
    North,
}

impl Side {
    /// All four sides.
    pub const ALL: [Side; 4] = [Side::West, Side::East, Side::South, Side::North];

    /// The axis whose value is fixed along this side.
    #[must_use]
    pub fn axis(self) -> usize {
        match self {
            Side::West | Side::East => 0,
            Side::South | Side::North => 1,
        }
    }

    /// Returns true for the low bound of the axis.
    #[must_use]
    pub fn is_low(self) -> bool {
        matches!(self, Side::West | Side::South)
    }

    /// Parameter value of this side in `domain`.
    #[must_use]
    pub fn bound(self, domain: &SurfaceDomain) -> f64 {
        let range = domain.axis(self.axis());
        if self.is_low() {
            range.min
        } else {
            range.max
        }
    }

    /// The side at the given end of `axis`.
    #[must_use]
    pub fn from_axis(axis: usize, low: bool) -> Self {
        match (axis, low) {
            (0, true) => Side::West,
            (0, false) => Side::East,
            (_, true) => Side::South,
            (_, false) => Side::North,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Interval;

    #[test]
    fn side_axes_and_bounds() {
        let d = SurfaceDomain::new(Interval::new(0.0, 2.0), Interval::new(-1.0, 1.0));
        assert_eq!(Side::West.axis(), 0);
        assert_eq!(Side::North.axis(), 1);
        assert!((Side::East.bound(&d) - 2.0).abs() < f64::EPSILON);
        assert!((Side::South.bound(&d) + 1.0).abs() < f64::EPSILON);
        assert_eq!(Side::from_axis(1, false), Side::North);
    }
}
