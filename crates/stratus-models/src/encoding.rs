//! Feature encoding for the linear models.
//!
//! Columns, in order: one per vendor, one per observation lag, then hour of
//! day and day of week each as a sin/cos pair. Missing vendor and lag values
//! are replaced by the training median of their column; every column is then
//! standardized with the training mean and standard deviation.

use crate::error::{ModelError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use stratus_data::Vendor;
use stratus_features::FeatureRow;

const CALENDAR_FEATURES: usize = 4;
const MIN_SCALE: f64 = 1e-12;

/// Imputation and scaling fitted on training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    lag_count: usize,
    medians: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl FeatureEncoder {
    /// Fit imputation medians and scaling on `rows`.
    pub fn fit(rows: &[&FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(ModelError::Unavailable("no rows to fit the encoder".to_string()));
        }

        let lag_count = rows.iter().map(|r| r.lags.len()).max().unwrap_or(0);
        let raw_width = Vendor::ALL.len() + lag_count;

        let medians = (0..raw_width)
            .map(|col| {
                let present: Vec<f64> = rows
                    .iter()
                    .filter_map(|r| raw_value(r, col, lag_count))
                    .collect();
                median(present).unwrap_or(0.0)
            })
            .collect();

        let mut encoder = Self {
            lag_count,
            medians,
            means: Vec::new(),
            scales: Vec::new(),
        };

        let raw = encoder.unscaled(rows);
        let n = rows.len() as f64;
        for column in raw.columns() {
            let mean = column.sum() / n;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let scale = var.sqrt();
            encoder.means.push(mean);
            encoder.scales.push(if scale > MIN_SCALE { scale } else { 1.0 });
        }

        Ok(encoder)
    }

    /// Number of encoded features.
    pub const fn n_features(&self) -> usize {
        Vendor::ALL.len() + self.lag_count + CALENDAR_FEATURES
    }

    /// Encode rows into a standardized `rows x n_features` matrix.
    pub fn encode(&self, rows: &[&FeatureRow]) -> Array2<f64> {
        let mut x = self.unscaled(rows);
        for (j, mut column) in x.columns_mut().into_iter().enumerate() {
            let (mean, scale) = (self.means[j], self.scales[j]);
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        x
    }

    fn unscaled(&self, rows: &[&FeatureRow]) -> Array2<f64> {
        let mut x = Array2::zeros((rows.len(), self.n_features()));
        for (i, row) in rows.iter().enumerate() {
            for (j, median) in self.medians.iter().enumerate() {
                x[[i, j]] = raw_value(row, j, self.lag_count).unwrap_or(*median);
            }
            let offset = self.medians.len();
            for (k, value) in calendar(row).into_iter().enumerate() {
                x[[i, offset + k]] = value;
            }
        }
        x
    }
}

fn raw_value(row: &FeatureRow, col: usize, lag_count: usize) -> Option<f64> {
    let vendors = Vendor::ALL.len();
    if col < vendors {
        row.vendors.get(Vendor::ALL[col])
    } else if col < vendors + lag_count {
        row.lags.get(col - vendors).copied().flatten()
    } else {
        None
    }
}

fn calendar(row: &FeatureRow) -> [f64; CALENDAR_FEATURES] {
    let hour = TAU * f64::from(row.hour) / 24.0;
    let dow = TAU * f64::from(row.day_of_week) / 7.0;
    [hour.sin(), hour.cos(), dow.sin(), dow.cos()]
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use stratus_data::Location;
    use stratus_features::VendorValues;

    fn row(open_meteo: Option<f64>, lag: Option<f64>, hour: u32) -> FeatureRow {
        let mut vendors = VendorValues::default();
        vendors.set(Vendor::OpenMeteo, open_meteo);
        FeatureRow {
            location: Location::new(0.0, 0.0),
            valid_time: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            vendors,
            lags: vec![lag],
            hour,
            day_of_week: 2,
            label: Some(1.0),
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_missing_values_use_training_median() {
        let rows = [
            row(Some(1.0), None, 0),
            row(Some(3.0), Some(5.0), 6),
            row(None, Some(7.0), 12),
        ];
        let refs: Vec<&FeatureRow> = rows.iter().collect();
        let encoder = FeatureEncoder::fit(&refs).unwrap();
        assert_eq!(encoder.n_features(), 5 + 1 + 4);

        let raw = encoder.unscaled(&refs);
        assert_relative_eq!(raw[[2, 0]], 2.0);
        assert_relative_eq!(raw[[0, 5]], 6.0);
        // Vendors never observed impute to zero
        assert_relative_eq!(raw[[0, 1]], 0.0);
    }

    #[test]
    fn test_encoded_columns_are_standardized() {
        let rows: Vec<FeatureRow> = (0..8).map(|h| row(Some(h as f64), Some(1.0), h)).collect();
        let refs: Vec<&FeatureRow> = rows.iter().collect();
        let encoder = FeatureEncoder::fit(&refs).unwrap();
        let x = encoder.encode(&refs);

        let open_meteo = x.column(0);
        assert_relative_eq!(open_meteo.sum(), 0.0, epsilon = 1e-9);
        let var = open_meteo.iter().map(|v| v * v).sum::<f64>() / 8.0;
        assert_relative_eq!(var, 1.0, epsilon = 1e-9);
        // Constant lag column centers to zero without blowing up
        assert!(x.column(5).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_fit_requires_rows() {
        assert!(matches!(
            FeatureEncoder::fit(&[]),
            Err(ModelError::Unavailable(_))
        ));
    }
}
