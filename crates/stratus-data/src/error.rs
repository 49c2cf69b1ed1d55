//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Variable name not known to the system
    #[error("Configuration error: unknown variable '{0}'")]
    UnknownVariable(String),

    /// Unit not convertible for a known variable
    #[error("Configuration error: unknown unit '{unit}' for variable {variable}")]
    UnknownUnit {
        /// Variable being normalized
        variable: String,
        /// Offending source unit
        unit: String,
    },

    /// Forecast source tag not known to the system
    #[error("Unknown forecast source: {0}")]
    UnknownSource(String),

    /// Forecast valid before it was issued
    #[error("Negative horizon: valid time {valid} precedes issue time {issue}")]
    NegativeHorizon {
        /// Issue time of the forecast
        issue: String,
        /// Valid time of the forecast
        valid: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Whether the error stems from configuration rather than data or storage.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownVariable(_) | Self::UnknownUnit { .. })
    }
}
