//! Prediction batch.
//!
//! Each unit's champion predicts the rows whose lead time from the issue
//! time is closest to the unit's horizon, so a valid time gets at most one
//! `our_model` forecast per issue.

use super::{BatchReport, Unit, run_units};
use crate::config::StratusConfig;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use stratus_data::records::horizon_hours;
use stratus_data::{ForecastRecord, ForecastSource, SqliteStore};
use stratus_features::{FeatureAssembler, FeatureRow};
use stratus_models::Predictor;
use stratus_registry::RunTracker;
use tracing::info;

/// Result of predicting one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictedUnit {
    /// The unit
    pub unit: Unit,
    /// Champion run that produced the forecasts
    pub run_identifier: String,
    /// Forecasts written
    pub forecasts: usize,
}

/// Writes champion forecasts as `our_model` records.
#[derive(Debug)]
pub struct PredictionJob<'a, T> {
    store: &'a SqliteStore,
    tracker: &'a T,
    config: &'a StratusConfig,
}

impl<'a, T: RunTracker> PredictionJob<'a, T> {
    /// Create a prediction job.
    pub const fn new(store: &'a SqliteStore, tracker: &'a T, config: &'a StratusConfig) -> Self {
        Self {
            store,
            tracker,
            config,
        }
    }

    /// Predict every configured unit, issued at `issue_time`.
    pub fn run(&self, issue_time: DateTime<Utc>) -> Result<BatchReport<PredictedUnit>> {
        self.run_with(issue_time, |_| {})
    }

    /// Predict every configured unit, calling `on_unit` after each one.
    pub fn run_with<P: FnMut(&Unit)>(
        &self,
        issue_time: DateTime<Utc>,
        on_unit: P,
    ) -> Result<BatchReport<PredictedUnit>> {
        let units = Unit::all(self.config);
        run_units(
            "predict",
            &units,
            |unit| self.predict_unit(unit, issue_time),
            on_unit,
        )
    }

    /// Predict one unit with its champion and persist the forecasts.
    pub fn predict_unit(&self, unit: Unit, issue_time: DateTime<Utc>) -> Result<PredictedUnit> {
        let champion = self
            .store
            .get_champion(&unit.name())?
            .ok_or_else(|| PipelineError::DataUnavailable(format!("{unit}: no champion")))?;
        let model = self.tracker.load(&champion.run_identifier)?;

        let assembler = FeatureAssembler::new(self.store, self.config.assembly.clone());
        let matrix = assembler.assemble_for_horizon(unit.variable, unit.horizon_hours)?;
        let rows: Vec<FeatureRow> = matrix
            .rows
            .into_iter()
            .filter(|r| {
                r.vendors.any()
                    && r.valid_time >= issue_time
                    && self.config.targets(&r.location)
                    && self.assigned_horizon(issue_time, r.valid_time) == Some(unit.horizon_hours)
            })
            .collect();
        if rows.is_empty() {
            return Err(PipelineError::DataUnavailable(format!(
                "{unit}: no rows to predict after {issue_time}"
            )));
        }

        let predictions = model.predict(&rows)?;
        let records = rows
            .iter()
            .zip(predictions)
            .map(|(row, value)| {
                ForecastRecord::new(
                    ForecastSource::OurModel,
                    row.location,
                    unit.variable,
                    issue_time,
                    row.valid_time,
                    value,
                )
            })
            .collect::<stratus_data::Result<Vec<_>>>()?;
        let forecasts = self.store.insert_forecasts(&records)?;

        info!(unit = %unit, run_id = %champion.run_identifier, forecasts, "predicted");
        Ok(PredictedUnit {
            unit,
            run_identifier: champion.run_identifier,
            forecasts,
        })
    }

    /// Configured horizon closest to the lead time of `valid_time`; ties go
    /// to the shorter horizon.
    fn assigned_horizon(
        &self,
        issue_time: DateTime<Utc>,
        valid_time: DateTime<Utc>,
    ) -> Option<u32> {
        let lead = horizon_hours(issue_time, valid_time).ok()?;
        nearest_horizon(lead, &self.config.horizons_hours)
    }
}

fn nearest_horizon(lead: u32, horizons: &[u32]) -> Option<u32> {
    horizons
        .iter()
        .copied()
        .min_by_key(|h| (h.abs_diff(lead), *h))
}
