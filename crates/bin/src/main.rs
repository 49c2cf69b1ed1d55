//! Stratus CLI binary.
//!
//! Provides command-line access to the scheduled batch jobs and the
//! verification leaderboard.

mod import;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::{CsvWriter, SerWriter};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use stratus::data::{SqliteStore, Variable};
use stratus::features::FeatureAssembler;
use stratus::output::{
    ExportFormat, Exporter, FoldMetricsExport, leaderboard_table, our_vs_best_table, run_table,
};
use stratus::registry::{FsRunTracker, PromotionEngine, PromotionOutcome, RunTracker};
use stratus::verify::{leaderboard, our_vs_best};
use stratus::{PredictionJob, StratusConfig, TrainingJob, Unit, run_verification};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Stratus: weather forecast verification and model promotion", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite store path (overrides STRATUS_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import ingested forecasts and observations from JSON lines
    Import {
        /// Forecast records, one JSON object per line
        #[arg(long)]
        forecasts: Option<PathBuf>,

        /// Observation records, one JSON object per line
        #[arg(long)]
        observations: Option<PathBuf>,
    },

    /// Score every forecast source against observations
    Verify,

    /// Train, evaluate and promote one model per variable and horizon
    Train,

    /// Write champion forecasts as our_model records
    Predict,

    /// Consider a tracked run for the champion slot of its model
    Promote {
        /// Run identifier, as printed by `train`
        run_id: String,
    },

    /// Verify, train and predict in sequence
    Run,

    /// Show mean errors per variable, horizon and source
    Leaderboard {
        /// Compare our model with the best vendor instead
        #[arg(long)]
        compare: bool,

        /// Only errors for valid times in the last N days
        #[arg(long, default_value = "30")]
        days: i64,

        /// Output format (text, csv, json or pretty-json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the current champion of every model
    Champions {
        /// Export walk-forward fold metrics instead of registry rows
        #[arg(long)]
        folds: bool,

        /// Output format (text, csv, json or pretty-json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export the assembled feature matrix of one variable and horizon as CSV
    Features {
        /// Variable, e.g. temp_2m
        variable: String,

        /// Forecast horizon in hours
        #[arg(long, default_value = "6")]
        horizon: u32,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show store statistics and the active configuration
    Stats,
}

/// Store, tracker and configuration shared by every command.
struct Pipeline {
    config: StratusConfig,
    store: SqliteStore,
    tracker: FsRunTracker,
}

impl Pipeline {
    fn open(database: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let mut config = StratusConfig::from_env()?;
        if let Some(path) = database {
            config.database_path = path;
        }
        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = SqliteStore::open(&config.database_path)?;
        let tracker = FsRunTracker::new(&config.model_dir)?;
        info!(database = %config.database_path.display(), "store opened");
        Ok(Self {
            config,
            store,
            tracker,
        })
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let pipeline = Pipeline::open(cli.database)?;

    match cli.command {
        Commands::Import {
            forecasts,
            observations,
        } => import_records(&pipeline, forecasts.as_deref(), observations.as_deref())?,
        Commands::Verify => verify(&pipeline)?,
        Commands::Train => train(&pipeline)?,
        Commands::Predict => predict(&pipeline)?,
        Commands::Promote { run_id } => promote(&pipeline, &run_id)?,
        Commands::Run => {
            verify(&pipeline)?;
            train(&pipeline)?;
            predict(&pipeline)?;
        }
        Commands::Leaderboard {
            compare,
            days,
            format,
            output,
        } => show_leaderboard(&pipeline, compare, days, &format, output.as_deref())?,
        Commands::Champions {
            folds,
            format,
            output,
        } => show_champions(&pipeline, folds, &format, output.as_deref())?,
        Commands::Features {
            variable,
            horizon,
            output,
        } => export_features(&pipeline, &variable, horizon, output.as_deref())?,
        Commands::Stats => show_stats(&pipeline)?,
    }

    Ok(())
}

fn import_records(
    pipeline: &Pipeline,
    forecasts: Option<&Path>,
    observations: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    if forecasts.is_none() && observations.is_none() {
        return Err("nothing to import: pass --forecasts and/or --observations".into());
    }
    if let Some(path) = forecasts {
        let records = import::read_forecasts(path)?;
        let n = pipeline.store.insert_forecasts(&records)?;
        println!("Imported {} forecasts from {}", n, path.display());
    }
    if let Some(path) = observations {
        let records = import::read_observations(path)?;
        let n = pipeline.store.insert_observations(&records)?;
        println!("Imported {} observations from {}", n, path.display());
    }
    Ok(())
}

fn progress(len: usize) -> Result<ProgressBar, Box<dyn Error>> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn verify(pipeline: &Pipeline) -> Result<(), Box<dyn Error>> {
    let summary = run_verification(&pipeline.store)?;
    println!(
        "Verification: {} error rows computed, {} new",
        summary.computed, summary.inserted
    );
    Ok(())
}

fn describe(outcome: &PromotionOutcome) -> String {
    match outcome {
        PromotionOutcome::FirstChampion { .. } => "first champion".to_string(),
        PromotionOutcome::Promoted {
            previous,
            challenger,
            ..
        } => format!(
            "promoted (RMSE {:.3} -> {:.3}, MAE {:.3} -> {:.3})",
            previous.rmse, challenger.rmse, previous.mae, challenger.mae
        ),
        PromotionOutcome::Retained { champion_run, .. } => {
            format!("champion {champion_run} retained")
        }
        PromotionOutcome::Skipped { reason } => format!("skipped: {reason}"),
    }
}

fn train(pipeline: &Pipeline) -> Result<(), Box<dyn Error>> {
    let job = TrainingJob::new(&pipeline.store, &pipeline.tracker, &pipeline.config)?;
    let pb = progress(Unit::all(&pipeline.config).len())?;
    pb.set_message("Training...");

    let result = job.run_with(Utc::now(), |unit| {
        pb.set_message(unit.to_string());
        pb.inc(1);
    });
    pb.finish_and_clear();
    let report = result?;

    println!("\nTraining");
    println!("{}", "=".repeat(80));
    for trained in &report.succeeded {
        println!(
            "{:<24} {:<12} rows {:>6}  RMSE {:>8.4}  MAE {:>8.4}  {}",
            trained.unit.name(),
            trained.algorithm,
            trained.training_rows,
            trained.evaluation.pooled_rmse,
            trained.evaluation.pooled_mae,
            describe(&trained.outcome)
        );
        println!("{:<24} run {}", "", trained.run_identifier);
    }
    for skipped in &report.skipped {
        println!("{:<24} skipped: {}", skipped.unit.name(), skipped.reason);
    }
    Ok(())
}

fn predict(pipeline: &Pipeline) -> Result<(), Box<dyn Error>> {
    let job = PredictionJob::new(&pipeline.store, &pipeline.tracker, &pipeline.config);
    let pb = progress(Unit::all(&pipeline.config).len())?;
    pb.set_message("Predicting...");

    let result = job.run_with(Utc::now(), |unit| {
        pb.set_message(unit.to_string());
        pb.inc(1);
    });
    pb.finish_and_clear();
    let report = result?;

    let total: usize = report.succeeded.iter().map(|p| p.forecasts).sum();
    println!(
        "Prediction: {} forecasts from {} champions ({} units skipped)",
        total,
        report.succeeded.len(),
        report.skipped.len()
    );
    Ok(())
}

fn promote(pipeline: &Pipeline, run_id: &str) -> Result<(), Box<dyn Error>> {
    let summary = pipeline.tracker.summary(run_id)?;
    let engine = PromotionEngine::new(pipeline.config.promotion.clone())?;
    let outcome = engine.consider(&pipeline.store, &summary.name, run_id, Utc::now())?;
    println!("{}: {}", summary.name, describe(&outcome));
    Ok(())
}

/// Print `text` for the text format, otherwise export `rows`.
fn emit<T: Serialize>(
    rows: &[T],
    format: &str,
    output: Option<&Path>,
    text: impl FnOnce() -> String,
) -> Result<(), Box<dyn Error>> {
    if format.eq_ignore_ascii_case("text") {
        let rendered = text();
        match output {
            Some(path) => fs::write(path, rendered)?,
            None => print!("{}", rendered),
        }
        return Ok(());
    }

    let format: ExportFormat = format.parse()?;
    match output {
        Some(path) => {
            rows.export_to_file(path, format)?;
            println!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => println!("{}", rows.export_to_string(format)?),
    }
    Ok(())
}

fn show_leaderboard(
    pipeline: &Pipeline,
    compare: bool,
    days: i64,
    format: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    if days <= 0 {
        return Err(format!("--days must be positive, got {days}").into());
    }
    let errors = pipeline
        .store
        .get_errors_since(Utc::now() - Duration::days(days))?;

    if compare {
        let rows = our_vs_best(&errors)?;
        emit(&rows, format, output, || our_vs_best_table(&rows))
    } else {
        let rows = leaderboard(&errors)?;
        emit(&rows, format, output, || leaderboard_table(&rows))
    }
}

fn show_champions(
    pipeline: &Pipeline,
    folds: bool,
    format: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let champions = pipeline.store.get_champions()?;
    let summaries = champions
        .iter()
        .map(|c| pipeline.tracker.summary(&c.run_identifier))
        .collect::<Result<Vec<_>, _>>()?;

    let text = || {
        if summaries.is_empty() {
            return "No champions yet.\n".to_string();
        }
        summaries.iter().map(run_table).collect::<Vec<_>>().join("\n")
    };

    if folds {
        let rows: Vec<FoldMetricsExport> = summaries
            .iter()
            .flat_map(FoldMetricsExport::from_summary)
            .collect();
        emit(&rows, format, output, text)
    } else {
        emit(&champions, format, output, text)
    }
}

fn export_features(
    pipeline: &Pipeline,
    variable: &str,
    horizon: u32,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let variable: Variable = variable.parse()?;
    let assembler = FeatureAssembler::new(&pipeline.store, pipeline.config.assembly.clone());
    let matrix = assembler.assemble_for_horizon(variable, horizon)?;
    let mut df = matrix.to_dataframe()?;

    match output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
            println!("Wrote {} feature rows to {}", df.height(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            CsvWriter::new(&mut stdout)
                .include_header(true)
                .finish(&mut df)?;
        }
    }
    Ok(())
}

fn show_stats(pipeline: &Pipeline) -> Result<(), Box<dyn Error>> {
    let stats = pipeline.store.get_stats()?;
    let config = &pipeline.config;

    println!("\nStore: {}", config.database_path.display());
    println!("{}", "=".repeat(80));
    println!("  Forecasts:      {:>10}", stats.forecasts);
    println!("  Observations:   {:>10}", stats.observations);
    println!("  Error rows:     {:>10}", stats.errors);
    println!("  Registry rows:  {:>10}", stats.models);
    println!("  Champions:      {:>10}", stats.champions);

    println!("\nConfiguration");
    println!("{}", "=".repeat(80));
    println!("  Run tracker:    {}", config.model_dir.display());
    println!(
        "  Variables:      {}",
        config
            .variables
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Horizons:       {:?}", config.horizons_hours);
    println!("  Lags (h):       {:?}", config.assembly.lag_hours);
    println!(
        "  Targets:        {}",
        if config.target_locations.is_empty() {
            "all stored locations".to_string()
        } else {
            config
                .target_locations
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    println!(
        "  Promotion:      >{:.1}% on RMSE and MAE over {} days",
        config.promotion.threshold * 100.0,
        config.promotion.window_days
    );
    Ok(())
}
