//! Environment configuration.
//!
//! Values are read from the process environment after loading an optional
//! `.env` file. List-valued settings are JSON arrays, e.g.
//! `HORIZONS_HOURS=[1,3,6]`.

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use stratus_data::{Location, Variable};
use stratus_features::AssemblyConfig;
use stratus_models::{EvaluationConfig, TrainerConfig};
use stratus_registry::{PromotionConfig, PromotionEngine};
use tracing::debug;

/// A location the pipeline trains and predicts for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetLocation {
    /// Display name
    pub name: String,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl TargetLocation {
    /// The store location this target refers to.
    pub const fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratusConfig {
    /// SQLite store path
    pub database_path: PathBuf,
    /// Run tracker root directory
    pub model_dir: PathBuf,
    /// Locations to train and predict for; empty means every stored location
    pub target_locations: Vec<TargetLocation>,
    /// Variables to process
    pub variables: Vec<Variable>,
    /// Horizons to process, in hours
    pub horizons_hours: Vec<u32>,
    /// Feature assembly settings
    pub assembly: AssemblyConfig,
    /// Walk-forward evaluation settings
    pub evaluation: EvaluationConfig,
    /// Promotion settings
    pub promotion: PromotionConfig,
    /// Trainer settings
    pub trainer: TrainerConfig,
}

impl StratusConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a key lookup.
    ///
    /// Missing keys take their defaults; malformed values are
    /// [`PipelineError::Configuration`] errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup("STRATUS_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => default_dir()?.join("stratus.db"),
        };
        let model_dir = match lookup("STRATUS_MODEL_DIR") {
            Some(path) => PathBuf::from(path),
            None => default_dir()?.join("runs"),
        };

        let target_locations: Vec<TargetLocation> =
            json_or(&lookup, "TARGET_LOCATIONS", Vec::new())?;

        let variable_names: Vec<String> = json_or(
            &lookup,
            "VARIABLES",
            Variable::ALL.iter().map(|v| v.as_str().to_string()).collect(),
        )?;
        let variables = variable_names
            .iter()
            .map(|name| Variable::from_str(name))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        if variables.is_empty() {
            return Err(PipelineError::Configuration(
                "VARIABLES must not be empty".to_string(),
            ));
        }

        let horizons_hours: Vec<u32> =
            json_or(&lookup, "HORIZONS_HOURS", vec![1, 3, 6, 12, 24, 48, 72])?;
        if horizons_hours.is_empty() {
            return Err(PipelineError::Configuration(
                "HORIZONS_HOURS must not be empty".to_string(),
            ));
        }

        let defaults = AssemblyConfig::default();
        let assembly = AssemblyConfig {
            lag_hours: json_or(&lookup, "OBS_LAGS_HOURS", defaults.lag_hours)?,
            label_tolerance_minutes: scalar_or(
                &lookup,
                "LABEL_TOLERANCE_MINUTES",
                defaults.label_tolerance_minutes,
            )?,
            horizon_slack_hours: defaults.horizon_slack_hours,
        };
        if assembly.label_tolerance_minutes < 0 {
            return Err(PipelineError::Configuration(format!(
                "LABEL_TOLERANCE_MINUTES must be non-negative, got {}",
                assembly.label_tolerance_minutes
            )));
        }

        let defaults = EvaluationConfig::default();
        let evaluation = EvaluationConfig {
            weeks_back: scalar_or(&lookup, "WEEKS_BACK", defaults.weeks_back)?,
            ..defaults
        };
        if evaluation.weeks_back == 0 {
            return Err(PipelineError::Configuration(
                "WEEKS_BACK must be at least 1".to_string(),
            ));
        }

        let defaults = PromotionConfig::default();
        let promotion = PromotionConfig {
            threshold: scalar_or(&lookup, "PROMOTION_THRESHOLD", defaults.threshold)?,
            window_days: scalar_or(&lookup, "PROMOTION_WINDOW_DAYS", defaults.window_days)?,
        };
        PromotionEngine::new(promotion.clone())
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let config = Self {
            database_path,
            model_dir,
            target_locations,
            variables,
            horizons_hours,
            assembly,
            evaluation,
            promotion,
            trainer: TrainerConfig::default(),
        };
        debug!(
            database = %config.database_path.display(),
            variables = config.variables.len(),
            horizons = config.horizons_hours.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Whether rows at `location` belong to the configured targets.
    pub fn targets(&self, location: &Location) -> bool {
        self.target_locations.is_empty()
            || self
                .target_locations
                .iter()
                .any(|t| t.location() == *location)
    }
}

fn default_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("stratus"))
        .ok_or_else(|| {
            PipelineError::Configuration(
                "no data directory; set STRATUS_DATABASE and STRATUS_MODEL_DIR".to_string(),
            )
        })
}

fn json_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: DeserializeOwned,
{
    lookup(key).map_or(Ok(default), |raw| {
        serde_json::from_str(&raw)
            .map_err(|e| PipelineError::Configuration(format!("{key}: {e} in '{raw}'")))
    })
}

fn scalar_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| PipelineError::Configuration(format!("{key}: {e} in '{raw}'")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<StratusConfig> {
        let mut env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        env.entry("STRATUS_DATABASE".into())
            .or_insert_with(|| "/tmp/stratus.db".into());
        env.entry("STRATUS_MODEL_DIR".into())
            .or_insert_with(|| "/tmp/runs".into());
        StratusConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.variables, Variable::ALL.to_vec());
        assert_eq!(config.horizons_hours, vec![1, 3, 6, 12, 24, 48, 72]);
        assert_eq!(config.assembly.lag_hours, vec![1, 3, 6]);
        assert_eq!(config.assembly.label_tolerance_minutes, 60);
        assert_eq!(config.evaluation.weeks_back, 6);
        assert_eq!(config.promotion.window_days, 7);
        assert!(config.target_locations.is_empty());
        assert!(config.targets(&Location::new(10.0, 20.0)));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("VARIABLES", r#"["temp_2m"]"#),
            ("HORIZONS_HOURS", "[6, 24]"),
            ("OBS_LAGS_HOURS", "[1, 2]"),
            ("LABEL_TOLERANCE_MINUTES", "30"),
            ("WEEKS_BACK", "4"),
            ("PROMOTION_THRESHOLD", "0.05"),
            ("TARGET_LOCATIONS", r#"[{"name": "Cape Town", "lat": -33.92, "lon": 18.42}]"#),
        ])
        .unwrap();
        assert_eq!(config.variables, vec![Variable::Temperature2m]);
        assert_eq!(config.horizons_hours, vec![6, 24]);
        assert_eq!(config.assembly.lag_hours, vec![1, 2]);
        assert_eq!(config.assembly.label_tolerance_minutes, 30);
        assert_eq!(config.evaluation.weeks_back, 4);
        assert!((config.promotion.threshold - 0.05).abs() < 1e-12);
        assert_eq!(config.target_locations[0].name, "Cape Town");
        assert!(config.targets(&Location::new(-33.92, 18.42)));
        assert!(!config.targets(&Location::new(-26.2, 28.04)));
    }

    #[test]
    fn test_configuration_errors() {
        for pairs in [
            [("VARIABLES", r#"["humidity"]"#)],
            [("VARIABLES", "[]")],
            [("HORIZONS_HOURS", "[]")],
            [("HORIZONS_HOURS", "1,3")],
            [("WEEKS_BACK", "six")],
            [("WEEKS_BACK", "0")],
            [("PROMOTION_THRESHOLD", "-0.1")],
            [("LABEL_TOLERANCE_MINUTES", "-5")],
        ] {
            let err = config(&pairs).unwrap_err();
            assert!(matches!(err, PipelineError::Configuration(_)), "{pairs:?}");
            assert!(err.is_fatal());
        }
    }
}
