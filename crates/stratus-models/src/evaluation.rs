//! Walk-Forward Evaluation
//!
//! Rolling-origin evaluation with weekly folds. Starting at the earliest
//! valid time, each fold trains on every row before `train_end` and
//! validates on `[train_end, train_end + window)`; the origin then moves
//! forward by one window. Folds stop once `train_end + window` passes the
//! latest valid time or `weeks_back` folds exist.
//!
//! The estimator is refitted for every fold on that fold's training rows, so
//! no fold's model has seen its validation window. When no weekly fold can
//! be formed a single chronological split is tried instead.

use crate::error::{ModelError, Result};
use crate::metrics::{mae, rmse};
use crate::model::{Estimator, Predictor};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use stratus_features::FeatureRow;
use tracing::debug;

/// Walk-forward configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Maximum number of folds (default: 6)
    pub weeks_back: usize,
    /// Fold window in days (default: 7)
    pub window_days: i64,
    /// Training share of the chronological fallback split (default: 0.8)
    pub fallback_train_fraction: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            weeks_back: 6,
            window_days: 7,
            fallback_train_fraction: 0.8,
        }
    }
}

/// Index ranges of one fold over time-sorted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training rows
    pub train: Range<usize>,
    /// Validation rows
    pub validate: Range<usize>,
}

/// Metrics of one validation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    /// Fold number, starting at 1
    pub fold: usize,
    /// Training rows
    pub train_rows: usize,
    /// Validation rows
    pub n: usize,
    /// First valid time in the validation window
    pub validate_start: DateTime<Utc>,
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
}

/// Outcome of a walk-forward evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Per-fold metrics
    pub folds: Vec<FoldMetrics>,
    /// RMSE over all validation predictions
    pub pooled_rmse: f64,
    /// MAE over all validation predictions
    pub pooled_mae: f64,
    /// Total validation rows
    pub n: usize,
    /// Whether the chronological fallback split was used
    pub used_fallback_split: bool,
}

/// Weekly folds over ascending `times`.
pub fn weekly_folds(times: &[DateTime<Utc>], window: Duration, weeks_back: usize) -> Vec<Fold> {
    let (Some(&min_t), Some(&max_t)) = (times.first(), times.last()) else {
        return Vec::new();
    };

    let mut folds = Vec::new();
    let mut start = min_t;
    while folds.len() < weeks_back {
        let train_end = start + window;
        let validate_end = train_end + window;
        if validate_end > max_t {
            break;
        }

        let split = times.partition_point(|t| *t < train_end);
        let end = times.partition_point(|t| *t < validate_end);
        if split > 0 && end > split {
            folds.push(Fold {
                train: 0..split,
                validate: split..end,
            });
        }
        start = train_end;
    }
    folds
}

/// Single chronological split of ascending `times`.
///
/// The cut is moved back so that rows sharing a valid time stay on the same
/// side. Returns `None` when either side would be empty.
pub fn chronological_split(times: &[DateTime<Utc>], train_fraction: f64) -> Option<Fold> {
    let n = times.len();
    let cut = ((n as f64) * train_fraction).floor() as usize;
    if cut == 0 || cut >= n {
        return None;
    }
    let cut = times.partition_point(|t| *t < times[cut]);
    (cut > 0).then_some(Fold {
        train: 0..cut,
        validate: cut..n,
    })
}

/// Walk-forward evaluator.
#[derive(Debug, Clone, Default)]
pub struct WalkForwardEvaluator {
    config: EvaluationConfig,
}

impl WalkForwardEvaluator {
    /// Create a new evaluator with the given configuration
    pub const fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    /// Evaluate `estimator` on `rows`.
    ///
    /// Only rows with a label and at least one vendor value take part.
    /// Returns [`ModelError::Infeasible`] when neither weekly folds nor the
    /// fallback split can be formed.
    pub fn evaluate<E: Estimator>(
        &self,
        estimator: &E,
        rows: &[FeatureRow],
    ) -> Result<EvaluationReport> {
        let mut eligible: Vec<FeatureRow> =
            rows.iter().filter(|r| r.is_trainable()).cloned().collect();
        eligible.sort_by(|a, b| {
            a.valid_time
                .cmp(&b.valid_time)
                .then_with(|| a.location.cmp(&b.location))
        });
        let times: Vec<DateTime<Utc>> = eligible.iter().map(|r| r.valid_time).collect();

        let window = Duration::days(self.config.window_days);
        let mut folds = weekly_folds(&times, window, self.config.weeks_back);
        let used_fallback_split = folds.is_empty();
        if used_fallback_split {
            let split = chronological_split(&times, self.config.fallback_train_fraction)
                .ok_or_else(|| {
                    ModelError::Infeasible(format!(
                        "{} eligible rows cannot form a train/validate split",
                        eligible.len()
                    ))
                })?;
            folds.push(split);
        }

        let mut fold_metrics = Vec::with_capacity(folds.len());
        let mut all_predicted = Vec::new();
        let mut all_actual = Vec::new();

        for (i, fold) in folds.into_iter().enumerate() {
            let train = &eligible[fold.train.clone()];
            let validate = &eligible[fold.validate.clone()];

            let model = estimator.fit(train)?;
            let predicted = model.predict(validate)?;
            let actual: Vec<f64> = validate.iter().filter_map(|r| r.label).collect();

            let metrics = FoldMetrics {
                fold: i + 1,
                train_rows: train.len(),
                n: validate.len(),
                validate_start: times[fold.validate.start],
                mae: mae(&predicted, &actual),
                rmse: rmse(&predicted, &actual),
            };
            debug!(
                fold = metrics.fold,
                train_rows = metrics.train_rows,
                n = metrics.n,
                rmse = metrics.rmse,
                "evaluated fold"
            );
            fold_metrics.push(metrics);
            all_predicted.extend(predicted);
            all_actual.extend(actual);
        }

        Ok(EvaluationReport {
            folds: fold_metrics,
            pooled_rmse: rmse(&all_predicted, &all_actual),
            pooled_mae: mae(&all_predicted, &all_actual),
            n: all_actual.len(),
            used_fallback_split,
        })
    }
}

/// Score an already fitted model on rows it was not trained on.
///
/// Every eligible row is predicted once and reported as a single fold with
/// no training rows. Returns [`ModelError::Infeasible`] when no row has a
/// label and a vendor value.
pub fn score_holdout<P: Predictor>(model: &P, rows: &[FeatureRow]) -> Result<EvaluationReport> {
    let mut eligible: Vec<FeatureRow> =
        rows.iter().filter(|r| r.is_trainable()).cloned().collect();
    eligible.sort_by(|a, b| {
        a.valid_time
            .cmp(&b.valid_time)
            .then_with(|| a.location.cmp(&b.location))
    });
    let Some(first) = eligible.first() else {
        return Err(ModelError::Infeasible("no labelled holdout rows".to_string()));
    };
    let validate_start = first.valid_time;

    let predicted = model.predict(&eligible)?;
    let actual: Vec<f64> = eligible.iter().filter_map(|r| r.label).collect();
    let metrics = FoldMetrics {
        fold: 1,
        train_rows: 0,
        n: actual.len(),
        validate_start,
        mae: mae(&predicted, &actual),
        rmse: rmse(&predicted, &actual),
    };
    Ok(EvaluationReport {
        pooled_rmse: metrics.rmse,
        pooled_mae: metrics.mae,
        n: metrics.n,
        folds: vec![metrics],
        used_fallback_split: false,
    })
}
