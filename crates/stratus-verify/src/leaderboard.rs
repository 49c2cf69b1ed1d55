//! Source leaderboards.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use stratus_data::{ErrorRecord, ForecastSource, Variable};

/// Mean accuracy of one source for one (variable, horizon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// Variable
    pub variable: Variable,
    /// Forecast horizon in hours
    pub horizon_hours: u32,
    /// Forecast source
    pub source: ForecastSource,
    /// Mean RMSE over error groups
    pub rmse: f64,
    /// Mean MAE over error groups
    pub mae: f64,
    /// Total verified pairs
    pub n: u64,
}

/// The trained model against the best vendor for one (variable, horizon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OurVsBest {
    /// Variable
    pub variable: Variable,
    /// Forecast horizon in hours
    pub horizon_hours: u32,
    /// Vendor with the lowest mean RMSE
    pub best_source: ForecastSource,
    /// Best vendor RMSE
    pub rmse_best: f64,
    /// Our RMSE
    pub rmse_our: f64,
    /// `rmse_our - rmse_best`
    pub rmse_diff: f64,
    /// Best vendor MAE
    pub mae_best: f64,
    /// Our MAE
    pub mae_our: f64,
    /// `mae_our - mae_best`
    pub mae_diff: f64,
}

fn errors_frame(errors: &[ErrorRecord]) -> Result<DataFrame> {
    let sources: Vec<&str> = errors.iter().map(|e| e.source.as_str()).collect();
    let variables: Vec<&str> = errors.iter().map(|e| e.variable.as_str()).collect();
    let horizons: Vec<u32> = errors.iter().map(|e| e.horizon_hours).collect();
    let rmse: Vec<f64> = errors.iter().map(|e| e.rmse).collect();
    let mae: Vec<f64> = errors.iter().map(|e| e.mae).collect();
    let n: Vec<u64> = errors.iter().map(|e| e.n as u64).collect();

    Ok(DataFrame::new(vec![
        Series::new("source".into(), sources).into(),
        Series::new("variable".into(), variables).into(),
        Series::new("horizon_hours".into(), horizons).into(),
        Series::new("rmse".into(), rmse).into(),
        Series::new("mae".into(), mae).into(),
        Series::new("n".into(), n).into(),
    ])?)
}

/// Mean RMSE / MAE per (variable, horizon, source) as a DataFrame, sorted
/// by variable, horizon and ascending RMSE.
pub fn leaderboard_frame(errors: &[ErrorRecord]) -> Result<DataFrame> {
    let df = errors_frame(errors)?
        .lazy()
        .group_by([col("variable"), col("horizon_hours"), col("source")])
        .agg([
            col("rmse").mean().alias("rmse"),
            col("mae").mean().alias("mae"),
            col("n").sum().alias("n"),
        ])
        .sort(
            ["variable", "horizon_hours", "rmse", "source"],
            Default::default(),
        )
        .collect()?;
    Ok(df)
}

/// Leaderboard rows, best source first within each (variable, horizon).
pub fn leaderboard(errors: &[ErrorRecord]) -> Result<Vec<LeaderboardRow>> {
    let df = leaderboard_frame(errors)?;

    let variables = df.column("variable")?.str()?;
    let horizons = df.column("horizon_hours")?.u32()?;
    let sources = df.column("source")?.str()?;
    let rmse = df.column("rmse")?.f64()?;
    let mae = df.column("mae")?.f64()?;
    let n = df.column("n")?.u64()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(variable), Some(horizon_hours), Some(source)) =
            (variables.get(i), horizons.get(i), sources.get(i))
        else {
            continue;
        };
        rows.push(LeaderboardRow {
            variable: variable.parse()?,
            horizon_hours,
            source: source.parse()?,
            rmse: rmse.get(i).unwrap_or(f64::NAN),
            mae: mae.get(i).unwrap_or(f64::NAN),
            n: n.get(i).unwrap_or(0),
        });
    }
    Ok(rows)
}

/// Best source (lowest mean RMSE) per (variable, horizon).
///
/// With `vendors_only` the trained model is left out of the ranking.
pub fn best_sources(rows: &[LeaderboardRow], vendors_only: bool) -> Vec<LeaderboardRow> {
    let mut best: Vec<LeaderboardRow> = Vec::new();
    for row in rows {
        if vendors_only && row.source == ForecastSource::OurModel {
            continue;
        }
        match best.last_mut() {
            Some(b) if b.variable == row.variable && b.horizon_hours == row.horizon_hours => {
                if row.rmse < b.rmse {
                    *b = row.clone();
                }
            }
            _ => best.push(row.clone()),
        }
    }
    best
}

/// Compare the trained model with the best vendor per (variable, horizon).
///
/// Only units where both have verified errors appear.
pub fn our_vs_best(errors: &[ErrorRecord]) -> Result<Vec<OurVsBest>> {
    let rows = leaderboard(errors)?;
    let best = best_sources(&rows, true);

    Ok(best
        .into_iter()
        .filter_map(|b| {
            let ours = rows.iter().find(|r| {
                r.source == ForecastSource::OurModel
                    && r.variable == b.variable
                    && r.horizon_hours == b.horizon_hours
            })?;
            Some(OurVsBest {
                variable: b.variable,
                horizon_hours: b.horizon_hours,
                best_source: b.source,
                rmse_best: b.rmse,
                rmse_our: ours.rmse,
                rmse_diff: ours.rmse - b.rmse,
                mae_best: b.mae,
                mae_our: ours.mae,
                mae_diff: ours.mae - b.mae,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use stratus_data::Vendor;

    fn error(source: ForecastSource, hour: i64, horizon: u32, rmse: f64, mae: f64) -> ErrorRecord {
        let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        ErrorRecord {
            source,
            variable: Variable::Temperature2m,
            valid_time: t0 + Duration::hours(hour),
            horizon_hours: horizon,
            mae,
            rmse,
            mape: 0.1,
            n: 2,
        }
    }

    fn sample() -> Vec<ErrorRecord> {
        let met_no = ForecastSource::Vendor(Vendor::MetNo);
        let open_meteo = ForecastSource::Vendor(Vendor::OpenMeteo);
        vec![
            error(met_no, 0, 6, 1.0, 0.8),
            error(met_no, 1, 6, 3.0, 2.2),
            error(open_meteo, 0, 6, 1.5, 1.0),
            error(open_meteo, 1, 6, 1.5, 1.2),
            error(ForecastSource::OurModel, 0, 6, 1.2, 0.9),
            error(ForecastSource::OurModel, 1, 6, 1.4, 1.1),
            error(met_no, 0, 24, 2.0, 1.5),
        ]
    }

    #[test]
    fn test_leaderboard_means() {
        let rows = leaderboard(&sample()).unwrap();
        assert_eq!(rows.len(), 4);

        // Horizon 6 sorted by RMSE: ours 1.3, open_meteo 1.5, met_no 2.0
        assert_eq!(rows[0].source, ForecastSource::OurModel);
        assert_relative_eq!(rows[0].rmse, 1.3);
        assert_eq!(rows[1].source, ForecastSource::Vendor(Vendor::OpenMeteo));
        assert_eq!(rows[2].source, ForecastSource::Vendor(Vendor::MetNo));
        assert_relative_eq!(rows[2].mae, 1.5);
        assert_eq!(rows[2].n, 4);
        assert_eq!(rows[3].horizon_hours, 24);
    }

    #[test]
    fn test_best_sources() {
        let rows = leaderboard(&sample()).unwrap();
        let best = best_sources(&rows, false);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].source, ForecastSource::OurModel);

        let vendors = best_sources(&rows, true);
        assert_eq!(vendors[0].source, ForecastSource::Vendor(Vendor::OpenMeteo));
    }

    #[test]
    fn test_our_vs_best() {
        let comparison = our_vs_best(&sample()).unwrap();
        // Horizon 24 has no trained-model errors
        assert_eq!(comparison.len(), 1);
        let c = &comparison[0];
        assert_eq!(c.best_source, ForecastSource::Vendor(Vendor::OpenMeteo));
        assert_relative_eq!(c.rmse_diff, -0.2, epsilon = 1e-9);
        assert_relative_eq!(c.mae_diff, -0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_errors() {
        assert!(leaderboard(&[]).unwrap().is_empty());
        assert!(our_vs_best(&[]).unwrap().is_empty());
    }
}
