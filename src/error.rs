//! Error types for oscillation analysis.

use thiserror::Error;

/// Errors raised by the transforms and the [`Oscillation`](crate::Oscillation) pipeline.
///
/// Numeric degeneracy (zero-variance channels, zero baselines) is deliberately
/// not represented here: it shows up as `NaN` in the affected outputs.
#[derive(Error, Debug)]
pub enum OscillationError {
    #[error("Invalid timing parameter '{parameter}': {value}")]
    InvalidTiming { parameter: &'static str, value: f64 },

    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: String,
    },

    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: usize,
        actual: usize,
        context: &'static str,
    },

    #[error("Insufficient trials: {n_trials} complete stimulus cycles available, at least 1 required")]
    InsufficientTrials { n_trials: usize },

    #[error("Insufficient data in {context}: {required} samples required, got {actual}")]
    InsufficientData {
        required: usize,
        actual: usize,
        context: &'static str,
    },

    #[error("Time series has no samples or no channels")]
    EmptyData,

    #[error("No masker attached; inverse mapping needs a series built from a masker")]
    MissingMasker,

    #[error("Masker error: {0}")]
    Masker(String),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for oscillation operations.
pub type Result<T> = std::result::Result<T, OscillationError>;
