//! Repair and simplification of NURBS curves and surfaces.
//!
//! The crate carries a compact NURBS kernel ([`geometry`]) and the healing
//! operations built on it ([`operations`]): surface-point correction near
//! seams and poles, zig-zag and end-kink removal, and control-point
//! simplification under a deviation bound.

pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod tessellation;

pub use config::HealConfig;
pub use error::{HealError, Result};
pub use operations::HealResult;
