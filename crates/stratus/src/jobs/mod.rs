//! Scheduled batch jobs.
//!
//! Training and prediction iterate over units, one per configured
//! `(variable, horizon)`. A unit that fails with a non-fatal error is
//! skipped with a single warning; a fatal error aborts the batch.

mod predict;
mod train;
mod verify;

pub use predict::{PredictedUnit, PredictionJob};
pub use train::{TrainedUnit, TrainingJob};
pub use verify::run_verification;

use crate::config::StratusConfig;
use crate::error::{PipelineError, Result};
use std::fmt;
use stratus_data::Variable;
use tracing::{info, warn};

/// One `(variable, horizon)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit {
    /// Variable
    pub variable: Variable,
    /// Horizon in hours
    pub horizon_hours: u32,
}

impl Unit {
    /// Create a unit.
    pub const fn new(variable: Variable, horizon_hours: u32) -> Self {
        Self {
            variable,
            horizon_hours,
        }
    }

    /// Registry name of the unit's model.
    pub fn name(&self) -> String {
        format!("{}_h{}", self.variable, self.horizon_hours)
    }

    /// Every configured unit, variables outermost.
    pub fn all(config: &StratusConfig) -> Vec<Self> {
        config
            .variables
            .iter()
            .flat_map(|&v| config.horizons_hours.iter().map(move |&h| Self::new(v, h)))
            .collect()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_h{}", self.variable, self.horizon_hours)
    }
}

/// A unit that produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    /// The unit
    pub unit: Unit,
    /// Rendered error
    pub reason: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport<T> {
    /// Units that produced output
    pub succeeded: Vec<T>,
    /// Units that were skipped
    pub skipped: Vec<SkippedUnit>,
}

impl<T> BatchReport<T> {
    /// Total number of units processed.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.skipped.len()
    }

    /// Whether no unit was processed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run `job` over `units`, isolating non-fatal failures.
///
/// `on_unit` is called after every unit, whatever its outcome.
pub(crate) fn run_units<T, F, P>(
    job: &str,
    units: &[Unit],
    mut work: F,
    mut on_unit: P,
) -> Result<BatchReport<T>>
where
    F: FnMut(Unit) -> Result<T>,
    P: FnMut(&Unit),
{
    let mut report = BatchReport {
        succeeded: Vec::with_capacity(units.len()),
        skipped: Vec::new(),
    };

    for &unit in units {
        match work(unit) {
            Ok(output) => report.succeeded.push(output),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(job, unit = %unit, error = %e, "unit skipped");
                report.skipped.push(SkippedUnit {
                    unit,
                    reason: e.to_string(),
                });
            }
        }
        on_unit(&unit);
    }

    if report.succeeded.is_empty() {
        return Err(PipelineError::NoOutput(format!(
            "{job}: none of {} units produced output",
            units.len()
        )));
    }

    info!(
        job,
        succeeded = report.succeeded.len(),
        skipped = report.skipped.len(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_data::DataError;

    fn units() -> Vec<Unit> {
        vec![
            Unit::new(Variable::Temperature2m, 6),
            Unit::new(Variable::Temperature2m, 24),
            Unit::new(Variable::Precipitation, 6),
        ]
    }

    #[test]
    fn test_unit_name() {
        assert_eq!(Unit::new(Variable::WindSpeed10m, 12).name(), "wind_speed_10m_h12");
        assert_eq!(Unit::new(Variable::Temperature2m, 1).to_string(), "temp_2m_h1");
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut seen = 0;
        let report = run_units(
            "test",
            &units(),
            |unit| {
                if unit.variable == Variable::Precipitation {
                    Err(PipelineError::DataUnavailable("no rows".into()))
                } else {
                    Ok(unit.horizon_hours)
                }
            },
            |_| seen += 1,
        )
        .unwrap();
        assert_eq!(report.succeeded, vec![6, 24]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].unit.variable, Variable::Precipitation);
        assert_eq!(report.len(), 3);
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_fatal_error_aborts() {
        let mut calls = 0;
        let err = run_units::<(), _, _>(
            "test",
            &units(),
            |_| {
                calls += 1;
                Err(PipelineError::Data(DataError::Io(std::io::Error::other("locked"))))
            },
            |_| {},
        )
        .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_no_output_is_failure() {
        let err = run_units::<(), _, _>(
            "test",
            &units(),
            |_| Err(PipelineError::DataUnavailable("empty".into())),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::NoOutput(_)));
    }
}
