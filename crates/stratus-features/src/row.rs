//! Feature rows and the feature matrix.

use crate::error::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use stratus_data::{Location, Variable, Vendor};

/// One optional forecast value per known vendor.
///
/// A missing vendor is an explicit `None`, never an absent key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorValues {
    /// Open-Meteo
    pub open_meteo: Option<f64>,
    /// MET Norway
    pub met_no: Option<f64>,
    /// OpenWeather
    pub openweather: Option<f64>,
    /// Visual Crossing
    pub visual_crossing: Option<f64>,
    /// weather.gov
    pub weather_gov: Option<f64>,
}

impl VendorValues {
    /// Value for one vendor.
    pub const fn get(&self, vendor: Vendor) -> Option<f64> {
        match vendor {
            Vendor::OpenMeteo => self.open_meteo,
            Vendor::MetNo => self.met_no,
            Vendor::OpenWeather => self.openweather,
            Vendor::VisualCrossing => self.visual_crossing,
            Vendor::WeatherGov => self.weather_gov,
        }
    }

    /// Set the value for one vendor.
    pub const fn set(&mut self, vendor: Vendor, value: Option<f64>) {
        match vendor {
            Vendor::OpenMeteo => self.open_meteo = value,
            Vendor::MetNo => self.met_no = value,
            Vendor::OpenWeather => self.openweather = value,
            Vendor::VisualCrossing => self.visual_crossing = value,
            Vendor::WeatherGov => self.weather_gov = value,
        }
    }

    /// Iterate `(vendor, value)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Vendor, Option<f64>)> + '_ {
        Vendor::ALL.into_iter().map(|v| (v, self.get(v)))
    }

    /// Whether at least one vendor has a value.
    pub fn any(&self) -> bool {
        self.iter().any(|(_, v)| v.is_some())
    }

    /// Mean over the vendors that have a value.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .iter()
            .filter_map(|(_, v)| v)
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// A single row of the feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Row location
    pub location: Location,
    /// Valid time the row describes
    pub valid_time: DateTime<Utc>,
    /// Vendor forecasts for this valid time
    pub vendors: VendorValues,
    /// Observed values `lag_hours[i]` hours before `valid_time`
    pub lags: Vec<Option<f64>>,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of week, Monday = 0
    pub day_of_week: u32,
    /// Training label, absent when no observation fell inside the tolerance
    pub label: Option<f64>,
}

impl FeatureRow {
    /// Row has a label and at least one vendor value.
    pub fn is_trainable(&self) -> bool {
        self.label.is_some() && self.vendors.any()
    }
}

/// Feature rows for one variable, sorted by `(location, valid_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    /// Variable the matrix describes
    pub variable: Variable,
    /// Configured lags, aligned with [`FeatureRow::lags`]
    pub lag_hours: Vec<u32>,
    /// Rows
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    /// An empty matrix.
    pub const fn empty(variable: Variable, lag_hours: Vec<u32>) -> Self {
        Self {
            variable,
            lag_hours,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows carrying a label.
    pub fn labelled(&self) -> usize {
        self.rows.iter().filter(|r| r.label.is_some()).count()
    }

    /// Column name of a lag feature.
    pub fn lag_column(hours: u32) -> String {
        format!("obs_lag_{hours}h")
    }

    /// Convert to a polars DataFrame.
    ///
    /// Columns: `lat`, `lon`, `valid_time`, one column per vendor,
    /// `obs_lag_{L}h` per lag, `hour`, `dow`, `y`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let lats: Vec<f64> = self.rows.iter().map(|r| r.location.lat).collect();
        let lons: Vec<f64> = self.rows.iter().map(|r| r.location.lon).collect();
        let times: Vec<i64> = self
            .rows
            .iter()
            .map(|r| r.valid_time.timestamp_millis())
            .collect();
        let valid_time = Series::new("valid_time".into(), times)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        let mut columns: Vec<Column> = vec![
            Series::new("lat".into(), lats).into(),
            Series::new("lon".into(), lons).into(),
            valid_time.into(),
        ];

        for vendor in Vendor::ALL {
            let values: Vec<Option<f64>> =
                self.rows.iter().map(|r| r.vendors.get(vendor)).collect();
            columns.push(Series::new(vendor.as_str().into(), values).into());
        }

        for (i, hours) in self.lag_hours.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.lags.get(i).copied().flatten())
                .collect();
            columns.push(Series::new(Self::lag_column(*hours).into(), values).into());
        }

        let hours: Vec<u32> = self.rows.iter().map(|r| r.hour).collect();
        let dows: Vec<u32> = self.rows.iter().map(|r| r.day_of_week).collect();
        let labels: Vec<Option<f64>> = self.rows.iter().map(|r| r.label).collect();
        columns.push(Series::new("hour".into(), hours).into());
        columns.push(Series::new("dow".into(), dows).into());
        columns.push(Series::new("y".into(), labels).into());

        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(vendors: VendorValues, label: Option<f64>) -> FeatureRow {
        FeatureRow {
            location: Location::new(1.0, 2.0),
            valid_time: Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
            vendors,
            lags: vec![Some(3.0), None],
            hour: 6,
            day_of_week: 2,
            label,
        }
    }

    #[test]
    fn test_vendor_values_access() {
        let mut values = VendorValues::default();
        assert!(!values.any());
        assert!(values.mean().is_none());

        values.set(Vendor::MetNo, Some(2.0));
        values.set(Vendor::WeatherGov, Some(4.0));
        assert_eq!(values.get(Vendor::MetNo), Some(2.0));
        assert_eq!(values.get(Vendor::OpenMeteo), None);
        assert!(values.any());
        assert_eq!(values.mean(), Some(3.0));
    }

    #[test]
    fn test_trainable_requires_label_and_vendor() {
        let mut vendors = VendorValues::default();
        assert!(!row(vendors, Some(1.0)).is_trainable());
        vendors.set(Vendor::OpenMeteo, Some(1.0));
        assert!(!row(vendors, None).is_trainable());
        assert!(row(vendors, Some(1.0)).is_trainable());
    }

    #[test]
    fn test_to_dataframe_columns() {
        let mut vendors = VendorValues::default();
        vendors.set(Vendor::OpenMeteo, Some(12.0));
        let matrix = FeatureMatrix {
            variable: Variable::Temperature2m,
            lag_hours: vec![1, 3],
            rows: vec![row(vendors, Some(11.5)), row(vendors, None)],
        };

        let df = matrix.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        // lat, lon, valid_time, 5 vendors, 2 lags, hour, dow, y
        assert_eq!(df.width(), 13);
        assert!(df.column("obs_lag_3h").is_ok());
        assert_eq!(df.column("y").unwrap().null_count(), 1);
        assert_eq!(df.column("met_no").unwrap().null_count(), 2);
    }
}
