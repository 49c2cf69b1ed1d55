#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod table;

pub use export::{ExportError, ExportFormat, Exporter, FoldMetricsExport};
pub use table::{leaderboard_table, our_vs_best_table, run_table};
