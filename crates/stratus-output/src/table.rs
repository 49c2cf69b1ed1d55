//! Plain-text tables.

use stratus_registry::RunSummary;
use stratus_verify::{LeaderboardRow, OurVsBest};

const WIDTH: usize = 80;

fn rule(output: &mut String, c: &str) {
    output.push_str(&c.repeat(WIDTH));
    output.push('\n');
}

/// Render a leaderboard as an ASCII table.
pub fn leaderboard_table(rows: &[LeaderboardRow]) -> String {
    let mut output = String::new();

    output.push_str("\nSource Leaderboard\n");
    rule(&mut output, "=");
    output.push_str(&format!(
        "{:<16} {:>8} {:<18} {:>10} {:>10} {:>10}\n",
        "Variable", "Horizon", "Source", "RMSE", "MAE", "N"
    ));
    rule(&mut output, "-");

    if rows.is_empty() {
        output.push_str("No verified forecasts yet.\n");
    }
    for row in rows {
        output.push_str(&format!(
            "{:<16} {:>7}h {:<18} {:>10.4} {:>10.4} {:>10}\n",
            row.variable.as_str(),
            row.horizon_hours,
            row.source.as_str(),
            row.rmse,
            row.mae,
            row.n
        ));
    }

    rule(&mut output, "=");
    output
}

/// Render the trained model against the best vendor.
pub fn our_vs_best_table(rows: &[OurVsBest]) -> String {
    let mut output = String::new();

    output.push_str("\nOur Model vs Best Vendor\n");
    rule(&mut output, "=");
    output.push_str(&format!(
        "{:<16} {:>8} {:<16} {:>12} {:>12} {:>10}\n",
        "Variable", "Horizon", "Best Vendor", "RMSE (ours)", "RMSE (best)", "Diff"
    ));
    rule(&mut output, "-");

    for row in rows {
        output.push_str(&format!(
            "{:<16} {:>7}h {:<16} {:>12.4} {:>12.4} {:>+10.4}\n",
            row.variable.as_str(),
            row.horizon_hours,
            row.best_source.as_str(),
            row.rmse_our,
            row.rmse_best,
            row.rmse_diff
        ));
    }

    rule(&mut output, "=");
    output
}

/// Render a tracked run and its walk-forward folds.
pub fn run_table(summary: &RunSummary) -> String {
    let mut output = String::new();
    let evaluation = &summary.evaluation;

    output.push_str(&format!("\nRun: {}\n", summary.run_identifier));
    output.push_str(&format!(
        "Model: {} ({}), trained {} on {} rows\n",
        summary.name,
        summary.algorithm,
        summary.trained_at.format("%Y-%m-%d %H:%M UTC"),
        summary.training_rows
    ));
    if evaluation.used_fallback_split {
        output.push_str("Evaluation: chronological 80/20 split\n");
    }
    rule(&mut output, "=");
    output.push_str(&format!(
        "{:<6} {:<20} {:>10} {:>10} {:>12} {:>12}\n",
        "Fold", "Validation Start", "Train", "N", "RMSE", "MAE"
    ));
    rule(&mut output, "-");

    for fold in &evaluation.folds {
        output.push_str(&format!(
            "{:<6} {:<20} {:>10} {:>10} {:>12.4} {:>12.4}\n",
            fold.fold,
            fold.validate_start.format("%Y-%m-%d %H:%M"),
            fold.train_rows,
            fold.n,
            fold.rmse,
            fold.mae
        ));
    }

    rule(&mut output, "-");
    output.push_str(&format!(
        "{:<6} {:<20} {:>10} {:>10} {:>12.4} {:>12.4}\n",
        "Pooled", "", "", evaluation.n, evaluation.pooled_rmse, evaluation.pooled_mae
    ));
    rule(&mut output, "=");
    output
}
