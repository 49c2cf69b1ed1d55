//! Model errors.

use thiserror::Error;

/// Errors raised while fitting, predicting or evaluating.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The algorithm cannot be fitted on this data; a simpler one may be used
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// No usable train/validate split could be formed
    #[error("Evaluation infeasible: {0}")]
    Infeasible(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
