#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod promotion;
pub mod tracker;

pub use error::{RegistryError, Result};
pub use promotion::{
    PromotionConfig, PromotionEngine, PromotionOutcome, WindowMetrics, relative_improvement,
};
pub use tracker::{FsRunTracker, RunSummary, RunTracker, TrackedRun};

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
