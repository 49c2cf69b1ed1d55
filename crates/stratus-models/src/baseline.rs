//! Vendor-consensus baseline.

use crate::error::{ModelError, Result};
use crate::model::{Estimator, Predictor, labels};
use serde::{Deserialize, Serialize};
use stratus_features::FeatureRow;

/// Predicts the mean of the available vendor forecasts.
#[derive(Debug, Clone, Copy, Default)]
pub struct VendorMean;

/// Fitted vendor-mean model.
///
/// Rows without any vendor value fall back to the training label mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorMeanModel {
    label_mean: f64,
}

impl Estimator for VendorMean {
    type Model = VendorMeanModel;

    fn fit(&self, rows: &[FeatureRow]) -> Result<VendorMeanModel> {
        let labels = labels(rows);
        if labels.is_empty() {
            return Err(ModelError::Unavailable("no labelled rows".to_string()));
        }
        Ok(VendorMeanModel {
            label_mean: labels.iter().sum::<f64>() / labels.len() as f64,
        })
    }
}

impl Predictor for VendorMeanModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        Ok(rows
            .iter()
            .map(|r| r.vendors.mean().unwrap_or(self.label_mean))
            .collect())
    }
}
