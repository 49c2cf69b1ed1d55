#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/stratus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod baseline;
pub mod encoding;
pub mod error;
pub mod evaluation;
pub mod fitted;
pub mod metrics;
pub mod model;
pub mod ridge;
pub mod trainer;

pub use baseline::{VendorMean, VendorMeanModel};
pub use encoding::FeatureEncoder;
pub use error::{ModelError, Result};
pub use evaluation::{
    EvaluationConfig, EvaluationReport, Fold, FoldMetrics, WalkForwardEvaluator,
    chronological_split, score_holdout, weekly_folds,
};
pub use fitted::{Algorithm, FittedModel};
pub use model::{Estimator, Predictor};
pub use ridge::{RidgeConfig, RidgeModel, RidgeRegression};
pub use trainer::{Trainer, TrainerConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
