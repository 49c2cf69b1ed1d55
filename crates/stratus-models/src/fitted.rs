//! Serializable fitted models.

use crate::baseline::VendorMeanModel;
use crate::error::Result;
use crate::model::Predictor;
use crate::ridge::RidgeModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use stratus_features::FeatureRow;

/// Algorithm a model was fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Ridge regression
    Ridge,
    /// Vendor-mean baseline
    VendorMean,
}

impl Algorithm {
    /// Stable name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ridge => "ridge",
            Self::VendorMean => "vendor_mean",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fitted model of any supported algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum FittedModel {
    /// Ridge regression
    Ridge(RidgeModel),
    /// Vendor-mean baseline
    VendorMean(VendorMeanModel),
}

impl FittedModel {
    /// Algorithm used.
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::Ridge(_) => Algorithm::Ridge,
            Self::VendorMean(_) => Algorithm::VendorMean,
        }
    }
}

impl Predictor for FittedModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        match self {
            Self::Ridge(m) => m.predict(rows),
            Self::VendorMean(m) => m.predict(rows),
        }
    }
}
