//! Pipeline errors.

use stratus_data::DataError;
use stratus_features::FeatureError;
use stratus_models::ModelError;
use stratus_registry::RegistryError;
use stratus_verify::VerifyError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the batch jobs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No usable rows or no champion for a unit
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Store error
    #[error("Store error: {0}")]
    Data(#[from] DataError),

    /// Feature assembly error
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// Training or evaluation error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Run tracking or promotion error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Verification error
    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),

    /// Every unit of a batch was skipped
    #[error("No output: {0}")]
    NoOutput(String),
}

impl PipelineError {
    /// Whether the error must abort the whole batch instead of skipping a unit.
    ///
    /// Configuration problems and an unreachable store are fatal; everything
    /// else is confined to the unit that raised it.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::NoOutput(_) => true,
            Self::Data(e)
            | Self::Feature(FeatureError::Data(e))
            | Self::Registry(RegistryError::Data(e))
            | Self::Verify(VerifyError::Data(e)) => is_fatal_data(e),
            _ => false,
        }
    }
}

const fn is_fatal_data(error: &DataError) -> bool {
    error.is_configuration() || matches!(error, DataError::Database(_) | DataError::Io(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(PipelineError::Configuration("bad".into()).is_fatal());
        assert!(PipelineError::Data(DataError::UnknownVariable("x".into())).is_fatal());
        assert!(
            PipelineError::Registry(RegistryError::Data(DataError::Io(std::io::Error::other(
                "gone"
            ))))
            .is_fatal()
        );
        assert!(!PipelineError::DataUnavailable("empty".into()).is_fatal());
        assert!(!PipelineError::Model(ModelError::Infeasible("short".into())).is_fatal());
        assert!(!PipelineError::Registry(RegistryError::RunNotFound("r".into())).is_fatal());
    }
}
