//! Tunable constants for every healing algorithm.
//!
//! The defaults are empirically tuned values. None of them has a derivation
//! behind it, so they are exposed as plain fields instead of being baked
//! into the algorithms.

/// Tolerance bands around singular surface sides, as fractions of the
/// domain length of the side's axis.
#[derive(Debug, Clone, Copy)]
pub struct SingularBands {
    /// A point this close to a pole is "close to singular".
    pub close: f64,
    /// A point this close to a pole is treated as sitting on it.
    pub almost: f64,
    /// Band used to catch gross mis-projections near a pole.
    pub high_jump: f64,
    /// Twice the high-jump band.
    pub high_jump_double: f64,
    /// Four times the high-jump band.
    pub high_jump_quad: f64,
    /// 3D length under which a boundary edge counts as collapsed to a point.
    pub edge_tolerance: f64,
    /// Number of samples taken along a boundary edge.
    pub edge_samples: usize,
}

impl Default for SingularBands {
    fn default() -> Self {
        Self {
            close: 0.01,
            almost: 0.001,
            high_jump: 0.06,
            high_jump_double: 0.12,
            high_jump_quad: 0.24,
            edge_tolerance: 1e-6,
            edge_samples: 9,
        }
    }
}

/// Seam detection parameters.
#[derive(Debug, Clone, Copy)]
pub struct SeamParams {
    /// Fraction of the domain length within which a value is "on the seam".
    pub on_seam: f64,
    /// 3D distance under which the low and high boundary edges coincide.
    pub coincidence: f64,
    /// Number of samples compared along the boundary edges.
    pub edge_samples: usize,
}

impl Default for SeamParams {
    fn default() -> Self {
        Self {
            on_seam: 1e-4,
            coincidence: 1e-6,
            edge_samples: 9,
        }
    }
}

/// Surface-point correction parameters.
#[derive(Debug, Clone, Copy)]
pub struct PointFixParams {
    /// Consecutive points closer than this (in uv) are duplicates.
    pub duplicate_tolerance: f64,
    /// Fraction of the seam axis length inside which a point is on the seam.
    pub seam_band: f64,
    /// Consecutive confidently off-seam points required before a jump is trusted.
    pub min_trusted_run: usize,
    /// Consecutive non-singular points required before extrapolating.
    pub min_history: usize,
    /// Initial step of the fast search, as a fraction of the domain length.
    pub search_fast_step: f64,
    /// Step of the slow search, as a fraction of the domain length.
    pub search_slow_step: f64,
    /// Step at which the searches stop halving, as a fraction of the domain length.
    pub search_min_step: f64,
    /// Hard iteration cap of each search.
    pub search_max_iterations: usize,
    /// 3D distance at which a search is considered converged.
    pub search_tolerance: f64,
    /// Tolerance of the interpolated curves built by the validation gate.
    pub validation_tolerance: f64,
    /// Allowed relative growth of the on-surface length before reverting.
    pub max_length_growth: f64,
    /// Length ratio above which a revert is logged as a warning.
    pub warn_ratio: f64,
    /// Length ratio above which a revert is logged as a severe warning.
    pub severe_ratio: f64,
}

impl Default for PointFixParams {
    fn default() -> Self {
        Self {
            duplicate_tolerance: 1e-10,
            seam_band: 0.01,
            min_trusted_run: 2,
            min_history: 2,
            search_fast_step: 0.01,
            search_slow_step: 1e-5,
            search_min_step: 1e-10,
            search_max_iterations: 10_000,
            search_tolerance: 1e-6,
            validation_tolerance: 1e-4,
            max_length_growth: 0.10,
            warn_ratio: 100.0,
            severe_ratio: 10_000.0,
        }
    }
}

/// Zig-zag removal parameters.
#[derive(Debug, Clone, Copy)]
pub struct ZigZagParams {
    /// Indices at most this many positions apart are merged into one diapason.
    pub merge_gap: usize,
    /// Widening step of the removal band, as a fraction of the domain.
    pub widen_step: f64,
    /// Maximum widening of the removal band, as a fraction of the domain.
    pub widen_max: f64,
    /// Number of samples taken by the diapason-removal strategy.
    pub resample_count: usize,
    /// Number of samples reordered by the global sorting strategy.
    pub sort_sample_count: usize,
    /// Number of samples used to score smoothness.
    pub smoothness_samples: usize,
}

impl Default for ZigZagParams {
    fn default() -> Self {
        Self {
            merge_gap: 1,
            widen_step: 0.01,
            widen_max: 0.05,
            resample_count: 400,
            sort_sample_count: 1000,
            smoothness_samples: 50,
        }
    }
}

/// Curve kink detection and removal parameters.
#[derive(Debug, Clone, Copy)]
pub struct KinkParams {
    /// Number of equal normalized-length segments sampled for tangents.
    pub samples: usize,
    /// Number of neighbouring segments forming the local reference.
    pub quartile: usize,
    /// Coarse end-tangent deviation below which a curve is kink-free.
    pub fast_reject_deg: f64,
    /// Minimum angular deviation of the end segment, in degrees.
    pub min_angle_deg: f64,
    /// Required ratio of the end deviation to the local maximum deviation.
    pub ratio: f64,
    /// Length fraction cut off at a kinked end.
    pub band: f64,
    /// Maximum deviation from the original outside the kink bands.
    pub max_deviation: f64,
    /// Number of samples used by the resampling strategies.
    pub resample_count: usize,
    /// Number of samples used by the deviation check.
    pub validation_samples: usize,
}

impl Default for KinkParams {
    fn default() -> Self {
        Self {
            samples: 20,
            quartile: 5,
            fast_reject_deg: 5.0,
            min_angle_deg: 5.0,
            ratio: 10.0,
            band: 0.05,
            max_deviation: 0.1,
            resample_count: 200,
            validation_samples: 100,
        }
    }
}

/// Simplification and complexification parameters.
#[derive(Debug, Clone)]
pub struct SimplifyParams {
    /// Candidate control-point counts, tried in ascending order.
    pub ladder: Vec<usize>,
    /// Allowed 3D deviation from the original.
    pub max_deviation: f64,
    /// Allowed 3D deviation for curves passing near a singularity.
    pub singular_max_deviation: f64,
    /// Allowed relative 3D length difference for 3D curves.
    pub length_tolerance: f64,
    /// Lower bound of the comparison resolution.
    pub min_segments: usize,
    /// Upper bound of the comparison resolution.
    pub max_segments: usize,
    /// Comparison segments per unit of 3D length.
    pub segments_per_unit: f64,
    /// Allowed deviation for complexified curves.
    pub complexify_max_deviation: f64,
    /// Multipliers of the desired count tried by complexify.
    pub complexify_multipliers: Vec<usize>,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            ladder: vec![2, 7, 13, 25, 51, 101, 201, 301],
            max_deviation: 0.001,
            singular_max_deviation: 0.0001,
            length_tolerance: 0.005,
            min_segments: 20,
            max_segments: 1000,
            segments_per_unit: 100.0,
            complexify_max_deviation: 0.001,
            complexify_multipliers: vec![1, 2, 3],
        }
    }
}

/// All tunable parameters in one place.
#[derive(Debug, Clone, Default)]
pub struct HealConfig {
    pub singular: SingularBands,
    pub seam: SeamParams,
    pub points: PointFixParams,
    pub zigzag: ZigZagParams,
    pub kink: KinkParams,
    pub simplify: SimplifyParams,
}
