//! Trainer with explicit fallback.
//!
//! Ridge regression is preferred. The vendor-mean baseline is used only when
//! ridge reports [`ModelError::Unavailable`]; every other error propagates.

use crate::baseline::VendorMean;
use crate::error::{ModelError, Result};
use crate::fitted::FittedModel;
use crate::model::Estimator;
use crate::ridge::{RidgeConfig, RidgeRegression};
use serde::{Deserialize, Serialize};
use stratus_features::FeatureRow;
use tracing::{debug, info};

/// Trainer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Ridge settings
    pub ridge: RidgeConfig,
}

/// Fits the preferred model, falling back to the baseline when unavailable.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    ridge: RidgeRegression,
}

impl Trainer {
    /// Create a trainer.
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            ridge: RidgeRegression::new(config.ridge),
        }
    }
}

impl Estimator for Trainer {
    type Model = FittedModel;

    fn fit(&self, rows: &[FeatureRow]) -> Result<FittedModel> {
        match self.ridge.fit(rows) {
            Ok(model) => {
                debug!(rows = rows.len(), "fitted ridge");
                Ok(FittedModel::Ridge(model))
            }
            Err(ModelError::Unavailable(reason)) => {
                info!(%reason, "ridge unavailable, using vendor mean");
                VendorMean.fit(rows).map(FittedModel::VendorMean)
            }
            Err(e) => Err(e),
        }
    }
}
