//! CSV and JSON export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use stratus_registry::RunSummary;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, ExportError> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Fold metrics of one tracked run, flattened for export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoldMetricsExport {
    /// Run identifier.
    pub run_identifier: String,

    /// Model name.
    pub name: String,

    /// Fold number, starting at 1.
    pub fold: usize,

    /// Training rows.
    pub train_rows: usize,

    /// Validation rows.
    pub n: usize,

    /// First valid time of the validation window.
    pub validate_start: DateTime<Utc>,

    /// Mean absolute error.
    pub mae: f64,

    /// Root mean squared error.
    pub rmse: f64,
}

impl FoldMetricsExport {
    /// One row per fold of a run.
    pub fn from_summary(summary: &RunSummary) -> Vec<Self> {
        summary
            .evaluation
            .folds
            .iter()
            .map(|f| Self {
                run_identifier: summary.run_identifier.clone(),
                name: summary.name.clone(),
                fold: f.fold,
                train_rows: f.train_rows,
                n: f.n,
                validate_start: f.validate_start,
                mae: f.mae,
                rmse: f.rmse,
            })
            .collect()
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl<T: Serialize> Exporter for [T] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use stratus_data::{ErrorRecord, ForecastSource, Variable, Vendor};

    fn errors() -> Vec<ErrorRecord> {
        vec![ErrorRecord {
            source: ForecastSource::Vendor(Vendor::VisualCrossing),
            variable: Variable::Precipitation,
            valid_time: Utc.with_ymd_and_hms(2024, 9, 1, 6, 0, 0).unwrap(),
            horizon_hours: 12,
            mae: 0.75,
            rmse: 1.5,
            mape: 0.25,
            n: 3,
        }]
    }

    #[test]
    fn test_errors_csv() {
        let csv = errors().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("source,variable,valid_time,horizon_hours,mae,rmse,mape,n")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("visual_crossing,precipitation,2024-09-01T06:00:00Z,12,"));
    }

    #[test]
    fn test_errors_json() {
        let json = errors().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"source\":\"visual_crossing\""));
        let back: Vec<ErrorRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, errors());

        let pretty = errors().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  "));
    }

    #[test]
    fn test_empty_csv_is_empty() {
        let empty: Vec<ErrorRecord> = Vec::new();
        assert_eq!(empty.export_to_string(ExportFormat::Csv).unwrap(), "");
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ExportError::InvalidFormat(_))
        ));
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
