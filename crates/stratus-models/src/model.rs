//! Estimator and predictor traits.

use crate::error::Result;
use stratus_features::FeatureRow;

/// A fitted model.
pub trait Predictor {
    /// Predict one value per row, aligned positionally with `rows`.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>>;
}

/// Something that can be fitted on labelled feature rows.
pub trait Estimator {
    /// Fitted model type
    type Model: Predictor;

    /// Fit on `rows`. Rows without a label are ignored.
    fn fit(&self, rows: &[FeatureRow]) -> Result<Self::Model>;
}

/// Labels of the labelled rows, in order.
pub(crate) fn labels(rows: &[FeatureRow]) -> Vec<f64> {
    rows.iter().filter_map(|r| r.label).collect()
}
