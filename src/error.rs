use thiserror::Error;

/// Top-level error type for the healing toolkit.
///
/// Only contract violations and kernel failures surface here. Geometry that
/// simply cannot be fixed is reported through
/// [`HealResult`](crate::operations::HealResult) instead.
#[derive(Debug, Error)]
pub enum HealError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("invalid nurbs definition: {0}")]
    InvalidNurbs(String),
}

/// Errors raised by fitting, interpolation and curve editing primitives.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("too few points: needed {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("linear system could not be solved: {0}")]
    Singular(String),

    #[error("incompatible curves: {0}")]
    Incompatible(String),
}

/// Errors related to healing operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`HealError`].
pub type Result<T> = std::result::Result<T, HealError>;
