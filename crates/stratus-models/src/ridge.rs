//! Ridge Regression
//!
//! Fits `y = b0 + X w` on standardized features by solving the penalized
//! normal equations
//!
//! (XᵀX + αI) w = Xᵀ(y - ȳ),  b0 = ȳ
//!
//! with a Cholesky factorization. The intercept is not penalized.

use crate::encoding::FeatureEncoder;
use crate::error::{ModelError, Result};
use crate::model::{Estimator, Predictor, labels};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use stratus_features::FeatureRow;

/// Ridge regression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    /// L2 penalty (default: 1.0)
    pub alpha: f64,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

/// Ridge regression estimator
#[derive(Debug, Clone, Default)]
pub struct RidgeRegression {
    config: RidgeConfig,
}

impl RidgeRegression {
    /// Create a new estimator with the given configuration
    pub const fn new(config: RidgeConfig) -> Self {
        Self { config }
    }
}

/// Fitted ridge model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeModel {
    encoder: FeatureEncoder,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl RidgeModel {
    /// Intercept (training label mean).
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficients on the standardized features.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Estimator for RidgeRegression {
    type Model = RidgeModel;

    fn fit(&self, rows: &[FeatureRow]) -> Result<RidgeModel> {
        let alpha = self.config.alpha;
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "ridge alpha must be finite and non-negative, got {alpha}"
            )));
        }

        let labelled: Vec<&FeatureRow> = rows.iter().filter(|r| r.label.is_some()).collect();
        let encoder = FeatureEncoder::fit(&labelled)?;
        let n_features = encoder.n_features();
        if labelled.len() < n_features + 2 {
            return Err(ModelError::Unavailable(format!(
                "{} training rows for {n_features} features",
                labelled.len()
            )));
        }

        let x = encoder.encode(&labelled);
        let y = Array1::from(labels(rows));
        let intercept = y.sum() / y.len() as f64;
        let centered = y - intercept;

        let gram = x.t().dot(&x) + Array2::<f64>::eye(n_features) * alpha;
        let rhs = x.t().dot(&centered);
        let coefficients = cholesky_solve(&gram, &rhs)?;

        Ok(RidgeModel {
            encoder,
            intercept,
            coefficients: coefficients.to_vec(),
        })
    }
}

impl Predictor for RidgeModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        if self.encoder.n_features() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.encoder.n_features(),
                actual: self.coefficients.len(),
            });
        }
        let refs: Vec<&FeatureRow> = rows.iter().collect();
        let x = self.encoder.encode(&refs);
        let w = Array1::from(self.coefficients.clone());
        Ok((x.dot(&w) + self.intercept).to_vec())
    }
}

/// Solve `A x = b` for symmetric positive definite `A`.
///
/// Returns [`ModelError::Unavailable`] when `A` is not positive definite.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            actual: a.ncols(),
        });
    }
    if b.len() != n {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    // A = L Lᵀ
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= 1e-12 * a[[j, j]].abs().max(1.0) {
            return Err(ModelError::Unavailable(
                "normal equations are not positive definite".to_string(),
            ));
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Ok(x)
}
