//! Error types for feature assembly.

use thiserror::Error;

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors that can occur while assembling features.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Record store error
    #[error("Data error: {0}")]
    Data(#[from] stratus_data::DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
