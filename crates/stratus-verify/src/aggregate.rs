//! Error aggregation.
//!
//! Forecasts are paired with every observation at the same location and
//! variable whose `obs_time` equals the forecast `valid_time` exactly. Pairs
//! are grouped per `(source, variable, valid_time, horizon_hours)`:
//!
//! - `mae  = mean |f - o|`
//! - `rmse = sqrt(mean (f - o)²)`
//! - `mape = mean |f - o| / (|o| + 1e-6)`

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use stratus_data::{
    ErrorRecord, ForecastRecord, ForecastSource, Location, ObservationRecord, SqliteStore, Variable,
};
use tracing::{debug, info};

const MAPE_EPSILON: f64 = 1e-6;

#[derive(Debug, Default)]
struct Accumulator {
    abs: f64,
    sq: f64,
    pct: f64,
    n: usize,
}

impl Accumulator {
    fn push(&mut self, forecast: f64, observed: f64) {
        let err = forecast - observed;
        self.abs += err.abs();
        self.sq += err * err;
        self.pct += err.abs() / (observed.abs() + MAPE_EPSILON);
        self.n += 1;
    }
}

/// Aggregate forecast errors against observations.
///
/// Output is ordered by `(valid_time, source, variable, horizon_hours)`.
pub fn compute_errors(
    forecasts: &[ForecastRecord],
    observations: &[ObservationRecord],
) -> Vec<ErrorRecord> {
    let mut observed: HashMap<(Location, Variable, DateTime<Utc>), Vec<f64>> = HashMap::new();
    for o in observations {
        observed
            .entry((o.location, o.variable, o.obs_time))
            .or_default()
            .push(o.value);
    }

    let mut groups: BTreeMap<(DateTime<Utc>, ForecastSource, Variable, u32), Accumulator> =
        BTreeMap::new();
    for f in forecasts {
        let Some(values) = observed.get(&(f.location(), f.variable(), f.valid_time())) else {
            continue;
        };
        let acc = groups
            .entry((f.valid_time(), f.source(), f.variable(), f.horizon_hours()))
            .or_default();
        for &o in values {
            acc.push(f.value(), o);
        }
    }

    groups
        .into_iter()
        .map(|((valid_time, source, variable, horizon_hours), acc)| {
            let n = acc.n as f64;
            ErrorRecord {
                source,
                variable,
                valid_time,
                horizon_hours,
                mae: acc.abs / n,
                rmse: (acc.sq / n).sqrt(),
                mape: acc.pct / n,
                n: acc.n,
            }
        })
        .collect()
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationSummary {
    /// Error groups computed
    pub computed: usize,
    /// Error groups inserted or updated
    pub inserted: usize,
}

/// Verify every variable in the store.
///
/// Groups are recomputed from every stored pair and written by key, so
/// late observations land in their group and unchanged groups are left
/// alone.
pub fn verify_store(store: &SqliteStore) -> Result<VerificationSummary> {
    let mut summary = VerificationSummary::default();

    for variable in Variable::ALL {
        let forecasts = store.get_forecasts(variable)?;
        let observations = store.get_observations(variable)?;
        let errors = compute_errors(&forecasts, &observations);
        summary.computed += errors.len();

        let written = store.upsert_errors(&errors)?;
        summary.inserted += written;
        debug!(%variable, computed = errors.len(), written, "verified");
    }

    info!(
        computed = summary.computed,
        inserted = summary.inserted,
        "verification complete"
    );
    Ok(summary)
}
