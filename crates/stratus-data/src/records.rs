//! Persisted record types.

use crate::error::{DataError, Result};
use crate::units::{CanonicalUnit, normalize_variable};
use crate::variable::{ForecastSource, Variable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A point location.
///
/// Coordinates are compared exactly (bitwise total order), matching the
/// exact-key joins the feature engine and the verifier perform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl Location {
    /// Create a new location.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Location {}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lat
            .total_cmp(&other.lat)
            .then_with(|| self.lon.total_cmp(&other.lon))
    }
}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

/// Round `valid - issue` to whole hours, rejecting negative horizons.
pub fn horizon_hours(issue_time: DateTime<Utc>, valid_time: DateTime<Utc>) -> Result<u32> {
    let seconds = (valid_time - issue_time).num_milliseconds() as f64 / 1000.0;
    let hours = (seconds / 3600.0).round();
    if hours < 0.0 {
        return Err(DataError::NegativeHorizon {
            issue: issue_time.to_rfc3339(),
            valid: valid_time.to_rfc3339(),
        });
    }
    Ok(hours as u32)
}

/// A single forecast value from one source.
///
/// Construct through [`ForecastRecord::new`] so `horizon_hours` is always
/// derived from the two timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForecastRecord")]
pub struct ForecastRecord {
    source: ForecastSource,
    location: Location,
    variable: Variable,
    issue_time: DateTime<Utc>,
    valid_time: DateTime<Utc>,
    horizon_hours: u32,
    value: f64,
    unit: CanonicalUnit,
}

impl ForecastRecord {
    /// Create a forecast record from a value already in canonical units.
    pub fn new(
        source: ForecastSource,
        location: Location,
        variable: Variable,
        issue_time: DateTime<Utc>,
        valid_time: DateTime<Utc>,
        value: f64,
    ) -> Result<Self> {
        Ok(Self {
            source,
            location,
            variable,
            issue_time,
            valid_time,
            horizon_hours: horizon_hours(issue_time, valid_time)?,
            value,
            unit: variable.canonical_unit(),
        })
    }

    /// Create a forecast record from a raw vendor value and unit.
    pub fn normalized(
        source: ForecastSource,
        location: Location,
        variable: Variable,
        issue_time: DateTime<Utc>,
        valid_time: DateTime<Utc>,
        raw_value: f64,
        raw_unit: &str,
    ) -> Result<Self> {
        let (value, _) = normalize_variable(variable, raw_value, raw_unit)?;
        Self::new(source, location, variable, issue_time, valid_time, value)
    }

    /// Producer of the forecast.
    pub const fn source(&self) -> ForecastSource {
        self.source
    }

    /// Forecast location.
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Forecast variable.
    pub const fn variable(&self) -> Variable {
        self.variable
    }

    /// When the forecast was issued.
    pub const fn issue_time(&self) -> DateTime<Utc> {
        self.issue_time
    }

    /// The time the forecast is valid for.
    pub const fn valid_time(&self) -> DateTime<Utc> {
        self.valid_time
    }

    /// Whole hours between issue and valid time.
    pub const fn horizon_hours(&self) -> u32 {
        self.horizon_hours
    }

    /// Forecast value in the canonical unit.
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Canonical unit of the value.
    pub const fn unit(&self) -> CanonicalUnit {
        self.unit
    }
}

/// Wire form of a forecast record; `horizon_hours` is recomputed on read.
#[derive(Debug, Deserialize)]
struct RawForecastRecord {
    source: ForecastSource,
    location: Location,
    variable: Variable,
    issue_time: DateTime<Utc>,
    valid_time: DateTime<Utc>,
    value: f64,
    #[serde(default)]
    unit: Option<String>,
}

impl TryFrom<RawForecastRecord> for ForecastRecord {
    type Error = DataError;

    fn try_from(raw: RawForecastRecord) -> Result<Self> {
        let unit = raw
            .unit
            .unwrap_or_else(|| raw.variable.canonical_unit().to_string());
        Self::normalized(
            raw.source,
            raw.location,
            raw.variable,
            raw.issue_time,
            raw.valid_time,
            raw.value,
            &unit,
        )
    }
}

/// A ground-truth observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Station or location identifier
    pub station_id: String,
    /// Observation location
    pub location: Location,
    /// Observed variable
    pub variable: Variable,
    /// Observation time
    pub obs_time: DateTime<Utc>,
    /// Observed value in the canonical unit
    pub value: f64,
    /// Canonical unit of the value
    pub unit: CanonicalUnit,
    /// Observation provider
    pub source: String,
}

impl ObservationRecord {
    /// Create an observation from a raw provider value and unit.
    pub fn normalized(
        station_id: impl Into<String>,
        location: Location,
        variable: Variable,
        obs_time: DateTime<Utc>,
        raw_value: f64,
        raw_unit: &str,
        source: impl Into<String>,
    ) -> Result<Self> {
        let (value, unit) = normalize_variable(variable, raw_value, raw_unit)?;
        Ok(Self {
            station_id: station_id.into(),
            location,
            variable,
            obs_time,
            value,
            unit,
            source: source.into(),
        })
    }
}

/// Accuracy of one source for one variable, valid time and horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Forecast source
    pub source: ForecastSource,
    /// Variable
    pub variable: Variable,
    /// Valid time the errors were measured at
    pub valid_time: DateTime<Utc>,
    /// Forecast horizon in hours
    pub horizon_hours: u32,
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error (fraction)
    pub mape: f64,
    /// Number of forecast/observation pairs
    pub n: usize,
}

/// A model registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Row id
    pub id: i64,
    /// Model name, one per (variable, horizon)
    pub name: String,
    /// Opaque handle into the run tracker
    pub run_identifier: String,
    /// Whether this row is the current champion
    pub is_champion: bool,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}

/// Pooled evaluation metrics of one tracked run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetricsRecord {
    /// Run the metrics belong to
    pub run_identifier: String,
    /// Model name
    pub name: String,
    /// Variable the model predicts
    pub variable: Variable,
    /// Horizon the model predicts
    pub horizon_hours: u32,
    /// When the metrics were recorded
    pub recorded_at: DateTime<Utc>,
    /// Pooled root mean squared error
    pub rmse: f64,
    /// Pooled mean absolute error
    pub mae: f64,
    /// Number of validated samples
    pub n: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Vendor;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[rstest]
    #[case(0, 0)]
    #[case(60, 1)]
    #[case(89, 1)]
    #[case(90, 2)]
    #[case(24 * 60 + 20, 24)]
    fn test_horizon_is_rounded_hours(#[case] minutes: i64, #[case] expected: u32) {
        let valid = t0() + Duration::minutes(minutes);
        assert_eq!(horizon_hours(t0(), valid).unwrap(), expected);
    }

    #[test]
    fn test_negative_horizon_rejected() {
        let valid = t0() - Duration::hours(2);
        let err = ForecastRecord::new(
            ForecastSource::Vendor(Vendor::MetNo),
            Location::new(1.0, 2.0),
            Variable::Temperature2m,
            t0(),
            valid,
            10.0,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::NegativeHorizon { .. }));
    }

    #[test]
    fn test_forecast_normalizes_raw_unit() {
        let record = ForecastRecord::normalized(
            ForecastSource::Vendor(Vendor::VisualCrossing),
            Location::new(1.0, 2.0),
            Variable::WindSpeed10m,
            t0(),
            t0() + Duration::hours(3),
            36.0,
            "km/h",
        )
        .unwrap();
        assert!((record.value() - 10.0).abs() < 1e-9);
        assert_eq!(record.unit(), CanonicalUnit::MetresPerSecond);
        assert_eq!(record.horizon_hours(), 3);
    }

    #[test]
    fn test_forecast_deserialize_recomputes_horizon() {
        let json = r#"{
            "source": "open_meteo",
            "location": {"lat": -33.9, "lon": 18.4},
            "variable": "temp_2m",
            "issue_time": "2024-05-01T00:00:00Z",
            "valid_time": "2024-05-01T06:00:00Z",
            "horizon_hours": 99,
            "value": 59.0,
            "unit": "F"
        }"#;
        let record: ForecastRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.horizon_hours(), 6);
        assert!((record.value() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_location_ordering_and_equality() {
        let a = Location::new(-33.9, 18.4);
        let b = Location::new(-33.9, 18.5);
        assert!(a < b);
        assert_eq!(a, Location::new(-33.9, 18.4));
    }
}
