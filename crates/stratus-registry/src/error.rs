//! Registry errors.

use stratus_data::DataError;
use thiserror::Error;

/// Errors raised by run tracking and promotion.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Store error
    #[error("Store error: {0}")]
    Data(#[from] DataError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No tracked run with this identifier
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
