//! Export of tracked runs to disk.

use chrono::{Duration, TimeZone, Utc};
use stratus_data::Variable;
use stratus_models::{Algorithm, EvaluationReport, FoldMetrics};
use stratus_output::{ExportFormat, Exporter, FoldMetricsExport};
use stratus_registry::RunSummary;

fn summary() -> RunSummary {
    let at = Utc.with_ymd_and_hms(2024, 10, 7, 0, 0, 0).unwrap();
    let folds = (1..=3)
        .map(|i| FoldMetrics {
            fold: i,
            train_rows: 168 * i,
            n: 168,
            validate_start: at - Duration::weeks(4 - i as i64),
            mae: 0.5 + i as f64 / 10.0,
            rmse: 0.7 + i as f64 / 10.0,
        })
        .collect();
    RunSummary {
        run_identifier: "precipitation_h6-20241007T000000Z".to_string(),
        name: "precipitation_h6".to_string(),
        variable: Variable::Precipitation,
        horizon_hours: 6,
        algorithm: Algorithm::Ridge,
        training_rows: 672,
        trained_at: at,
        evaluation: EvaluationReport {
            folds,
            pooled_rmse: 0.9,
            pooled_mae: 0.7,
            n: 504,
            used_fallback_split: false,
        },
    }
}

#[test]
fn test_fold_metrics_to_csv_file() {
    let rows = FoldMetricsExport::from_summary(&summary());
    assert_eq!(rows.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join(format!("folds.{}", ExportFormat::Csv.extension()));
    rows.export_to_file(&path, ExportFormat::Csv).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("run_identifier,name,fold,train_rows,n,validate_start"));
    assert!(lines[1].contains("precipitation_h6,1,168,168,2024-09-16T00:00:00Z"));
}

#[test]
fn test_fold_metrics_json_round_trip() {
    let rows = FoldMetricsExport::from_summary(&summary());
    let json = rows.export_to_string(ExportFormat::PrettyJson).unwrap();
    let back: Vec<FoldMetricsExport> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 3);
    assert_eq!(back[2].train_rows, 504);
}
