//! Feature assembly engine.

use crate::calendar::{day_of_week, hour_of_day};
use crate::error::Result;
use crate::label::nearest_within;
use crate::lags::ObservationSeries;
use crate::pivot::pivot_vendors;
use crate::row::{FeatureMatrix, FeatureRow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use stratus_data::{ForecastRecord, RecordSource, Variable};
use tracing::debug;

/// Configuration for feature assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Observation lags in hours (default: 1, 3, 6)
    pub lag_hours: Vec<u32>,
    /// Label join tolerance in minutes (default: 60)
    pub label_tolerance_minutes: i64,
    /// Accepted distance from the requested horizon in hours (default: 1)
    pub horizon_slack_hours: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            lag_hours: vec![1, 3, 6],
            label_tolerance_minutes: 60,
            horizon_slack_hours: 1,
        }
    }
}

impl AssemblyConfig {
    /// Label tolerance as a duration.
    pub fn label_tolerance(&self) -> Duration {
        Duration::minutes(self.label_tolerance_minutes)
    }
}

/// Builds feature matrices from a record source.
#[derive(Debug)]
pub struct FeatureAssembler<'a, S> {
    source: &'a S,
    config: AssemblyConfig,
}

impl<'a, S: RecordSource> FeatureAssembler<'a, S> {
    /// Create an assembler over a record source.
    pub const fn new(source: &'a S, config: AssemblyConfig) -> Self {
        Self { source, config }
    }

    /// The assembler configuration.
    pub const fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Assemble the feature matrix for a variable from every vendor forecast.
    ///
    /// Returns an empty matrix when no vendor forecast exists for the
    /// variable. Missing lags and labels are `None`, never errors.
    pub fn assemble(&self, variable: Variable) -> Result<FeatureMatrix> {
        let forecasts = self.source.forecasts(variable)?;
        self.build(variable, &forecasts)
    }

    /// Assemble the feature matrix for a variable, keeping only vendor
    /// forecasts whose horizon lies within the configured slack of `horizon`.
    pub fn assemble_for_horizon(&self, variable: Variable, horizon: u32) -> Result<FeatureMatrix> {
        let slack = self.config.horizon_slack_hours;
        let forecasts: Vec<ForecastRecord> = self
            .source
            .forecasts(variable)?
            .into_iter()
            .filter(|f| f.horizon_hours().abs_diff(horizon) <= slack)
            .collect();
        self.build(variable, &forecasts)
    }

    fn build(&self, variable: Variable, forecasts: &[ForecastRecord]) -> Result<FeatureMatrix> {
        let pivot = pivot_vendors(forecasts);
        if pivot.is_empty() {
            debug!(%variable, "no vendor forecasts");
            return Ok(FeatureMatrix::empty(variable, self.config.lag_hours.clone()));
        }

        let observations = self.source.observations(variable)?;
        let series = ObservationSeries::from_records(&observations);
        let tolerance = self.config.label_tolerance();

        let mut rows = Vec::with_capacity(pivot.len());
        // Pivot rows are sorted by (location, valid_time): label one location at a time
        for group in pivot.chunk_by(|a, b| a.location == b.location) {
            let location = group[0].location;
            let keys: Vec<_> = group.iter().map(|p| p.valid_time).collect();
            let labels = nearest_within(&keys, series.at(&location), tolerance);

            for (p, label) in group.iter().zip(labels) {
                rows.push(FeatureRow {
                    location,
                    valid_time: p.valid_time,
                    vendors: p.vendors,
                    lags: series.lag_features(&location, p.valid_time, &self.config.lag_hours),
                    hour: hour_of_day(p.valid_time),
                    day_of_week: day_of_week(p.valid_time),
                    label,
                });
            }
        }

        let matrix = FeatureMatrix {
            variable,
            lag_hours: self.config.lag_hours.clone(),
            rows,
        };
        debug!(
            %variable,
            rows = matrix.len(),
            labelled = matrix.labelled(),
            "assembled features"
        );
        Ok(matrix)
    }
}
