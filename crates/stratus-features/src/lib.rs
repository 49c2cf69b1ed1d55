#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assembly;
pub mod calendar;
pub mod error;
pub mod label;
pub mod lags;
pub mod pivot;
pub mod row;

pub use assembly::{AssemblyConfig, FeatureAssembler};
pub use error::{FeatureError, Result};
pub use row::{FeatureMatrix, FeatureRow, VendorValues};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
