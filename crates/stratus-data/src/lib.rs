#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod records;
pub mod source;
pub mod store;
pub mod units;
pub mod variable;

pub use error::{DataError, Result};
pub use records::{
    ErrorRecord, ForecastRecord, Location, ModelMetricsRecord, ModelRecord, ObservationRecord,
};
pub use source::{RecordSet, RecordSource};
pub use store::{SqliteStore, StoreStats};
pub use units::{CanonicalUnit, normalize, normalize_variable};
pub use variable::{ForecastSource, Variable, Vendor};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
