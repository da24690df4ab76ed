//! Healing operations on NURBS curves, surface points and surfaces.
//!
//! Every operation is a command object: build it with `new`, adjust it with
//! `with_*` methods and run it with `execute`.

pub mod classify;
pub mod fix_points;
pub mod kink;
pub mod outcome;
pub mod simplify;
pub mod zigzag;

pub use classify::{Side, SingularBand, SurfaceSeams, SurfaceSingulars};
pub use fix_points::{pull_back, CorrectionSnapshot, FixSurfacePoints, PointFixReport};
pub use kink::{
    CurveKinkData, CurveKinkFind, CurveKinkRemove, KinkStrategy, SurfaceKinkData, SurfaceKinkFind,
    SurfaceKinkRemove,
};
pub use outcome::HealResult;
pub use simplify::{
    ComplexifyCurve, CurveDeviation, SimplifyAttempt, SimplifyCurve, SimplifyOutcome,
};
pub use zigzag::{
    find_zigzag_indices, group_diapasons, ZigZagDiapason, ZigZagFind, ZigZagRemove,
    ZigZagStrategy,
};
