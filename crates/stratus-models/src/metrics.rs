//! Point-forecast error metrics.

/// Mean absolute error. `NaN` for empty input.
pub fn mae(predicted: &[f64], actual: &[f64]) -> f64 {
    debug_assert_eq!(predicted.len(), actual.len());
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .sum();
    sum / predicted.len() as f64
}

/// Root mean squared error. `NaN` for empty input.
pub fn rmse(predicted: &[f64], actual: &[f64]) -> f64 {
    debug_assert_eq!(predicted.len(), actual.len());
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    (sum / predicted.len() as f64).sqrt()
}
