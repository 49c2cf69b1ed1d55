#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod jobs;

// Re-export main types from sub-crates
pub use stratus_data as data;
pub use stratus_features as features;
pub use stratus_models as models;
pub use stratus_output as output;
pub use stratus_registry as registry;
pub use stratus_verify as verify;

pub use config::{StratusConfig, TargetLocation};
pub use error::{PipelineError, Result};
pub use jobs::{
    BatchReport, PredictedUnit, PredictionJob, SkippedUnit, TrainedUnit, TrainingJob, Unit,
    run_verification,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
