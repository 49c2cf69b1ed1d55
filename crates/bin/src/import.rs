//! JSON-lines import of ingested records.
//!
//! One record per line. Forecast lines carry `source`, `location`,
//! `variable`, `issue_time`, `valid_time`, `value` and an optional raw
//! `unit`; observation lines carry `station_id`, `location`, `variable`,
//! `obs_time`, `value`, an optional `unit` and an optional `source`.
//! Values are normalized to canonical units on read.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use stratus::data::{ForecastRecord, Location, ObservationRecord, Variable};

#[derive(Debug, Deserialize)]
struct ObservationLine {
    station_id: String,
    location: Location,
    variable: Variable,
    obs_time: DateTime<Utc>,
    value: f64,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default = "default_observation_source")]
    source: String,
}

fn default_observation_source() -> String {
    "meteostat".to_string()
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| format!("{}:{}: {}", path.display(), i + 1, e))?;
        records.push(record);
    }
    Ok(records)
}

/// Read forecast records, normalizing raw vendor units.
pub(crate) fn read_forecasts(path: &Path) -> Result<Vec<ForecastRecord>, Box<dyn Error>> {
    read_lines(path)
}

/// Read observation records, normalizing raw provider units.
pub(crate) fn read_observations(path: &Path) -> Result<Vec<ObservationRecord>, Box<dyn Error>> {
    read_lines::<ObservationLine>(path)?
        .into_iter()
        .map(|line| {
            let unit = line
                .unit
                .unwrap_or_else(|| line.variable.canonical_unit().to_string());
            ObservationRecord::normalized(
                line.station_id,
                line.location,
                line.variable,
                line.obs_time,
                line.value,
                &unit,
                line.source,
            )
            .map_err(Into::into)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use stratus::data::{ForecastSource, Vendor};

    fn write(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_read_forecasts_normalizes_units() {
        let file = write(&[
            r#"{"source":"openweather","location":{"lat":-33.9,"lon":18.4},"variable":"temp_2m","issue_time":"2024-05-01T00:00:00Z","valid_time":"2024-05-01T06:00:00Z","value":293.15,"unit":"K"}"#,
            "",
            r#"{"source":"met_no","location":{"lat":-33.9,"lon":18.4},"variable":"wind_speed_10m","issue_time":"2024-05-01T00:00:00Z","valid_time":"2024-05-01T03:00:00Z","value":36.0,"unit":"km/h"}"#,
        ]);
        let records = read_forecasts(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source(), ForecastSource::Vendor(Vendor::OpenWeather));
        assert!((records[0].value() - 20.0).abs() < 1e-9);
        assert_eq!(records[0].horizon_hours(), 6);
        assert!((records[1].value() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_read_observations_defaults() {
        let file = write(&[
            r#"{"station_id":"FACT","location":{"lat":-33.9,"lon":18.4},"variable":"temp_2m","obs_time":"2024-05-01T06:00:00Z","value":18.5}"#,
        ]);
        let records = read_observations(file.path()).unwrap();
        assert_eq!(records[0].source, "meteostat");
        assert!((records[0].value - 18.5).abs() < 1e-9);
    }

    #[test]
    fn test_bad_line_reports_position() {
        let file = write(&[r#"{"station_id":"FACT"}"#]);
        let err = read_observations(file.path()).unwrap_err();
        assert!(err.to_string().contains(":1:"));
    }
}
