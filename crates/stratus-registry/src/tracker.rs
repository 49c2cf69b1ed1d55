//! Run tracking.
//!
//! A run is one trained model together with its evaluation. The filesystem
//! tracker keeps every run in its own directory:
//!
//! ```text
//! <root>/<run_id>/model.json    serialized FittedModel
//! <root>/<run_id>/metrics.json  RunSummary
//! ```

use crate::error::{RegistryError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use stratus_data::Variable;
use stratus_models::{Algorithm, EvaluationReport, FittedModel};
use tracing::debug;

const MODEL_FILE: &str = "model.json";
const METRICS_FILE: &str = "metrics.json";

/// A trained run to be tracked.
#[derive(Debug, Clone)]
pub struct TrackedRun {
    /// Model name, `"{variable}_h{horizon}"`
    pub name: String,
    /// Predicted variable
    pub variable: Variable,
    /// Predicted horizon
    pub horizon_hours: u32,
    /// Final model fitted on every eligible row
    pub model: FittedModel,
    /// Walk-forward evaluation
    pub evaluation: EvaluationReport,
    /// Rows the final model was fitted on
    pub training_rows: usize,
    /// Training time
    pub trained_at: DateTime<Utc>,
}

/// Metadata and metrics stored with a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_identifier: String,
    /// Model name
    pub name: String,
    /// Predicted variable
    pub variable: Variable,
    /// Predicted horizon
    pub horizon_hours: u32,
    /// Algorithm of the final model
    pub algorithm: Algorithm,
    /// Rows the final model was fitted on
    pub training_rows: usize,
    /// Training time
    pub trained_at: DateTime<Utc>,
    /// Walk-forward evaluation
    pub evaluation: EvaluationReport,
}

/// Persists trained runs and loads their models back.
pub trait RunTracker {
    /// Store a run and return its identifier.
    fn log_run(&self, run: &TrackedRun) -> Result<String>;

    /// Load the model of a run.
    fn load(&self, run_identifier: &str) -> Result<FittedModel>;

    /// Load the summary of a run.
    fn summary(&self, run_identifier: &str) -> Result<RunSummary>;
}

/// Run tracker backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FsRunTracker {
    root: PathBuf,
}

impl FsRunTracker {
    /// Create a tracker rooted at `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Tracker root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, run_identifier: &str) -> Result<PathBuf> {
        let valid = !run_identifier.is_empty()
            && run_identifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
        if !valid {
            return Err(RegistryError::InvalidParameter(format!(
                "invalid run identifier: {run_identifier:?}"
            )));
        }
        Ok(self.root.join(run_identifier))
    }

    /// Pick a fresh identifier `"{name}-{timestamp}"`, suffixed on collision.
    fn allocate(&self, name: &str, at: DateTime<Utc>) -> Result<(String, PathBuf)> {
        let base = format!("{name}-{}", at.format("%Y%m%dT%H%M%SZ"));
        let mut candidate = base.clone();
        let mut suffix = 1;
        loop {
            let dir = self.run_dir(&candidate)?;
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((candidate, dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    candidate = format!("{base}-{suffix}");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, run_identifier: &str, file: &str) -> Result<T> {
        let path = self.run_dir(run_identifier)?.join(file);
        let reader = match File::open(&path) {
            Ok(f) => BufReader::new(f),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::RunNotFound(run_identifier.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(reader)?)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

impl RunTracker for FsRunTracker {
    fn log_run(&self, run: &TrackedRun) -> Result<String> {
        let (run_identifier, dir) = self.allocate(&run.name, run.trained_at)?;

        let summary = RunSummary {
            run_identifier: run_identifier.clone(),
            name: run.name.clone(),
            variable: run.variable,
            horizon_hours: run.horizon_hours,
            algorithm: run.model.algorithm(),
            training_rows: run.training_rows,
            trained_at: run.trained_at,
            evaluation: run.evaluation.clone(),
        };
        write_json(&dir.join(MODEL_FILE), &run.model)?;
        write_json(&dir.join(METRICS_FILE), &summary)?;

        debug!(run_id = %run_identifier, algorithm = %summary.algorithm, "logged run");
        Ok(run_identifier)
    }

    fn load(&self, run_identifier: &str) -> Result<FittedModel> {
        self.read_json(run_identifier, MODEL_FILE)
    }

    fn summary(&self, run_identifier: &str) -> Result<RunSummary> {
        self.read_json(run_identifier, METRICS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stratus_data::Location;
    use stratus_features::{FeatureRow, VendorValues};
    use stratus_models::{Estimator, VendorMean};

    fn run() -> TrackedRun {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        let rows = vec![FeatureRow {
            location: Location::new(0.0, 0.0),
            valid_time: at,
            vendors: VendorValues::default(),
            lags: vec![],
            hour: 3,
            day_of_week: 5,
            label: Some(12.0),
        }];
        TrackedRun {
            name: "temp_2m_h6".to_string(),
            variable: Variable::Temperature2m,
            horizon_hours: 6,
            model: FittedModel::VendorMean(VendorMean.fit(&rows).unwrap()),
            evaluation: EvaluationReport {
                folds: vec![],
                pooled_rmse: 1.5,
                pooled_mae: 1.2,
                n: 40,
                used_fallback_split: true,
            },
            training_rows: 1,
            trained_at: at,
        }
    }

    #[test]
    fn test_log_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FsRunTracker::new(dir.path()).unwrap();

        let id = tracker.log_run(&run()).unwrap();
        assert_eq!(id, "temp_2m_h6-20240601T030000Z");
        assert!(dir.path().join(&id).join("model.json").is_file());
        assert!(dir.path().join(&id).join("metrics.json").is_file());

        assert_eq!(tracker.load(&id).unwrap(), run().model);
        let summary = tracker.summary(&id).unwrap();
        assert_eq!(summary.algorithm, Algorithm::VendorMean);
        assert_eq!(summary.evaluation.n, 40);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FsRunTracker::new(dir.path()).unwrap();
        let a = tracker.log_run(&run()).unwrap();
        let b = tracker.log_run(&run()).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, format!("{a}-2"));
    }

    #[test]
    fn test_unknown_and_invalid_runs() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FsRunTracker::new(dir.path()).unwrap();
        assert!(matches!(
            tracker.load("missing"),
            Err(RegistryError::RunNotFound(_))
        ));
        assert!(matches!(
            tracker.load("../escape"),
            Err(RegistryError::InvalidParameter(_))
        ));
    }
}
