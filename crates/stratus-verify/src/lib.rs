#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod leaderboard;

pub use aggregate::{VerificationSummary, compute_errors, verify_store};
pub use error::{Result, VerifyError};
pub use leaderboard::{
    LeaderboardRow, OurVsBest, best_sources, leaderboard, leaderboard_frame, our_vs_best,
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
