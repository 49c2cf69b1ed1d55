//! Verification errors.

use polars::prelude::PolarsError;
use stratus_data::DataError;
use thiserror::Error;

/// Errors raised during verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Store error
    #[error("Store error: {0}")]
    Data(#[from] DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Result type for verification.
pub type Result<T> = std::result::Result<T, VerifyError>;
