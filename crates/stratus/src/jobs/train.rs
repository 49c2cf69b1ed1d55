//! Training batch.

use super::{BatchReport, Unit, run_units};
use crate::config::StratusConfig;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use stratus_data::{ModelMetricsRecord, SqliteStore};
use stratus_features::{FeatureAssembler, FeatureRow};
use stratus_models::{
    Algorithm, Estimator, EvaluationReport, Trainer, WalkForwardEvaluator, score_holdout,
};
use stratus_registry::{PromotionEngine, PromotionOutcome, RunTracker, TrackedRun};
use tracing::{debug, info, warn};

/// Result of training one unit.
#[derive(Debug, Clone)]
pub struct TrainedUnit {
    /// The unit
    pub unit: Unit,
    /// Tracker handle of the new run
    pub run_identifier: String,
    /// Algorithm the trainer settled on
    pub algorithm: Algorithm,
    /// Rows the final model was fitted on
    pub training_rows: usize,
    /// Walk-forward evaluation of the trainer
    pub evaluation: EvaluationReport,
    /// Promotion decision for the new run
    pub outcome: PromotionOutcome,
}

/// Trains, evaluates and registers one model per unit.
#[derive(Debug)]
pub struct TrainingJob<'a, T> {
    store: &'a SqliteStore,
    tracker: &'a T,
    config: &'a StratusConfig,
    trainer: Trainer,
    evaluator: WalkForwardEvaluator,
    promotion: PromotionEngine,
}

impl<'a, T: RunTracker> TrainingJob<'a, T> {
    /// Create a training job.
    pub fn new(store: &'a SqliteStore, tracker: &'a T, config: &'a StratusConfig) -> Result<Self> {
        let promotion = PromotionEngine::new(config.promotion.clone())
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        Ok(Self {
            store,
            tracker,
            config,
            trainer: Trainer::new(config.trainer.clone()),
            evaluator: WalkForwardEvaluator::new(config.evaluation.clone()),
            promotion,
        })
    }

    /// Train every configured unit.
    pub fn run(&self, now: DateTime<Utc>) -> Result<BatchReport<TrainedUnit>> {
        self.run_with(now, |_| {})
    }

    /// Train every configured unit, calling `on_unit` after each one.
    pub fn run_with<P: FnMut(&Unit)>(
        &self,
        now: DateTime<Utc>,
        on_unit: P,
    ) -> Result<BatchReport<TrainedUnit>> {
        let units = Unit::all(self.config);
        run_units("train", &units, |unit| self.train_unit(unit, now), on_unit)
    }

    /// Train, evaluate, log and consider one unit for promotion.
    pub fn train_unit(&self, unit: Unit, now: DateTime<Utc>) -> Result<TrainedUnit> {
        let rows = self.training_rows(unit)?;
        let name = unit.name();

        let evaluation = self.evaluator.evaluate(&self.trainer, &rows)?;
        let model = self.trainer.fit(&rows)?;
        let algorithm = model.algorithm();

        let run_identifier = self.tracker.log_run(&TrackedRun {
            name: name.clone(),
            variable: unit.variable,
            horizon_hours: unit.horizon_hours,
            model,
            evaluation: evaluation.clone(),
            training_rows: rows.len(),
            trained_at: now,
        })?;
        self.store
            .put_model_metrics(&metrics_record(unit, &run_identifier, &evaluation, now))?;
        info!(
            unit = %unit,
            run_id = %run_identifier,
            %algorithm,
            rows = rows.len(),
            rmse = evaluation.pooled_rmse,
            mae = evaluation.pooled_mae,
            "trained"
        );

        self.rescore_champion(unit, &rows, &run_identifier, now)?;
        let outcome = self
            .promotion
            .consider(self.store, &name, &run_identifier, now)?;

        Ok(TrainedUnit {
            unit,
            run_identifier,
            algorithm,
            training_rows: rows.len(),
            evaluation,
            outcome,
        })
    }

    /// Trainable rows of a unit, restricted to the configured targets.
    fn training_rows(&self, unit: Unit) -> Result<Vec<FeatureRow>> {
        let assembler = FeatureAssembler::new(self.store, self.config.assembly.clone());
        let matrix = assembler.assemble_for_horizon(unit.variable, unit.horizon_hours)?;
        let rows: Vec<FeatureRow> = matrix
            .rows
            .into_iter()
            .filter(|r| r.is_trainable() && self.config.targets(&r.location))
            .collect();
        if rows.is_empty() {
            return Err(PipelineError::DataUnavailable(format!(
                "{unit}: no labelled rows with vendor forecasts"
            )));
        }
        debug!(unit = %unit, rows = rows.len(), "training rows");
        Ok(rows)
    }

    /// Score the current champion on the rows it has not seen.
    ///
    /// Only rows with `valid_time` after the champion's training time count,
    /// so its metrics are out-of-sample like the challenger's walk-forward
    /// metrics. Without such rows nothing is recorded.
    fn rescore_champion(
        &self,
        unit: Unit,
        rows: &[FeatureRow],
        challenger_run: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(champion) = self.store.get_champion(&unit.name())? else {
            return Ok(());
        };
        if champion.run_identifier == challenger_run {
            return Ok(());
        }

        let scored = self
            .tracker
            .summary(&champion.run_identifier)
            .and_then(|summary| {
                let model = self.tracker.load(&champion.run_identifier)?;
                Ok((summary.trained_at, model))
            })
            .map_err(PipelineError::from)
            .and_then(|(trained_at, model)| {
                let unseen: Vec<FeatureRow> = rows
                    .iter()
                    .filter(|r| r.valid_time > trained_at)
                    .cloned()
                    .collect();
                if unseen.is_empty() {
                    return Ok(None);
                }
                Ok(Some(score_holdout(&model, &unseen)?))
            });
        match scored {
            Ok(Some(report)) => {
                self.store.put_model_metrics(&metrics_record(
                    unit,
                    &champion.run_identifier,
                    &report,
                    now,
                ))?;
                debug!(
                    unit = %unit,
                    run_id = %champion.run_identifier,
                    n = report.n,
                    rmse = report.pooled_rmse,
                    "champion re-scored"
                );
            }
            Ok(None) => {
                debug!(
                    unit = %unit,
                    run_id = %champion.run_identifier,
                    "no rows newer than the champion"
                );
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(
                    unit = %unit,
                    run_id = %champion.run_identifier,
                    error = %e,
                    "champion not re-scored"
                );
            }
        }
        Ok(())
    }
}

fn metrics_record(
    unit: Unit,
    run_identifier: &str,
    report: &EvaluationReport,
    now: DateTime<Utc>,
) -> ModelMetricsRecord {
    ModelMetricsRecord {
        run_identifier: run_identifier.to_string(),
        name: unit.name(),
        variable: unit.variable,
        horizon_hours: unit.horizon_hours,
        recorded_at: now,
        rmse: report.pooled_rmse,
        mae: report.pooled_mae,
        n: report.n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use stratus_data::{
        ForecastRecord, ForecastSource, Location, ObservationRecord, Variable, Vendor,
    };
    use stratus_registry::FsRunTracker;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    }

    fn config(dir: &std::path::Path) -> StratusConfig {
        let db = dir.join("stratus.db").display().to_string();
        let runs = dir.join("runs").display().to_string();
        StratusConfig::from_lookup(|key| match key {
            "STRATUS_DATABASE" => Some(db.clone()),
            "STRATUS_MODEL_DIR" => Some(runs.clone()),
            "VARIABLES" => Some(r#"["temp_2m"]"#.to_string()),
            "HORIZONS_HOURS" => Some("[6]".to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// Hourly data over `hours`: two vendors around a diurnal signal.
    fn seed(store: &SqliteStore, hours: std::ops::Range<i64>) {
        let location = Location::new(-33.9, 18.4);
        let mut forecasts = Vec::new();
        let mut observations = Vec::new();
        for h in hours {
            let valid = t0() + Duration::hours(h);
            let truth = 15.0 + 5.0 * ((h % 24) as f64 / 24.0 * std::f64::consts::TAU).sin();
            for (vendor, bias) in [(Vendor::OpenMeteo, 1.0), (Vendor::MetNo, -0.5)] {
                forecasts.push(
                    ForecastRecord::new(
                        ForecastSource::Vendor(vendor),
                        location,
                        Variable::Temperature2m,
                        valid - Duration::hours(6),
                        valid,
                        truth + bias,
                    )
                    .unwrap(),
                );
            }
            observations.push(
                ObservationRecord::normalized(
                    "cpt",
                    location,
                    Variable::Temperature2m,
                    valid,
                    truth,
                    "C",
                    "meteostat",
                )
                .unwrap(),
            );
        }
        store.insert_forecasts(&forecasts).unwrap();
        store.insert_observations(&observations).unwrap();
    }

    #[test]
    fn test_first_run_becomes_champion() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let store = SqliteStore::in_memory().unwrap();
        let tracker = FsRunTracker::new(&config.model_dir).unwrap();
        seed(&store, 0..72);

        let job = TrainingJob::new(&store, &tracker, &config).unwrap();
        let report = job.run(t0() + Duration::days(3)).unwrap();

        assert_eq!(report.succeeded.len(), 1);
        let trained = &report.succeeded[0];
        assert_eq!(trained.unit.name(), "temp_2m_h6");
        assert!(trained.evaluation.used_fallback_split);
        assert!(matches!(trained.outcome, PromotionOutcome::FirstChampion { .. }));

        let champion = store.get_champion("temp_2m_h6").unwrap().unwrap();
        assert_eq!(champion.run_identifier, trained.run_identifier);
        assert!(tracker.load(&trained.run_identifier).is_ok());
    }

    #[test]
    fn test_retraining_on_same_rows_compares_like_with_like() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let store = SqliteStore::in_memory().unwrap();
        let tracker = FsRunTracker::new(&config.model_dir).unwrap();
        seed(&store, 0..72);

        let job = TrainingJob::new(&store, &tracker, &config).unwrap();
        let first_at = t0() + Duration::days(3);
        let first = job.run(first_at).unwrap();
        let second = job.run(first_at + Duration::hours(1)).unwrap();

        // No row is newer than the champion, so only its own walk-forward
        // metrics count and they match the identical challenger's
        let champion_run = &first.succeeded[0].run_identifier;
        let recorded = store
            .get_model_metrics_since(champion_run, first_at)
            .unwrap();
        assert_eq!(recorded.len(), 1);
        let PromotionOutcome::Retained {
            current,
            challenger,
            ..
        } = &second.succeeded[0].outcome
        else {
            panic!("unexpected outcome {:?}", second.succeeded[0].outcome);
        };
        assert_eq!(current.n, challenger.n);
        assert!((current.rmse - challenger.rmse).abs() < 1e-12);
        assert!((current.mae - challenger.mae).abs() < 1e-12);
    }

    #[test]
    fn test_champion_is_rescored_on_newer_rows_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let store = SqliteStore::in_memory().unwrap();
        let tracker = FsRunTracker::new(&config.model_dir).unwrap();
        seed(&store, 0..72);

        let job = TrainingJob::new(&store, &tracker, &config).unwrap();
        let first_at = t0() + Duration::hours(72);
        let first = job.run(first_at).unwrap();
        seed(&store, 72..120);
        let later = t0() + Duration::hours(120);
        job.run(later).unwrap();

        // Hours 73..=119 arrived after the champion was trained
        let champion_run = &first.succeeded[0].run_identifier;
        let fresh = store.get_model_metrics_since(champion_run, later).unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].n, 47);
    }

    #[test]
    fn test_stale_champion_without_new_rows_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let store = SqliteStore::in_memory().unwrap();
        let tracker = FsRunTracker::new(&config.model_dir).unwrap();
        seed(&store, 0..72);

        let job = TrainingJob::new(&store, &tracker, &config).unwrap();
        let first = job.run(t0() + Duration::days(3)).unwrap();
        let second = job.run(t0() + Duration::days(20)).unwrap();

        assert!(matches!(
            second.succeeded[0].outcome,
            PromotionOutcome::Skipped { .. }
        ));
        assert_eq!(
            store.get_champion("temp_2m_h6").unwrap().unwrap().run_identifier,
            first.succeeded[0].run_identifier
        );
    }

    #[test]
    fn test_empty_store_has_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let store = SqliteStore::in_memory().unwrap();
        let tracker = FsRunTracker::new(&config.model_dir).unwrap();

        let job = TrainingJob::new(&store, &tracker, &config).unwrap();
        let err = job.run(t0()).unwrap_err();
        assert!(matches!(err, PipelineError::NoOutput(_)));
    }
}
