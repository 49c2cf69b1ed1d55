//! Champion/challenger promotion.
//!
//! Per model name there is either no champion or exactly one. The first
//! candidate under a name becomes champion. Afterwards a challenger replaces
//! the champion only when, over the trailing window, it improves both RMSE
//! and MAE by more than the threshold. Missing metrics on either side keep
//! the champion.

use crate::error::{RegistryError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stratus_data::{ModelMetricsRecord, ModelRecord, SqliteStore};
use tracing::{debug, info};

/// Promotion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    /// Required relative improvement on both metrics (default: 0.02)
    pub threshold: f64,
    /// Trailing comparison window in days (default: 7)
    pub window_days: i64,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            window_days: 7,
        }
    }
}

/// Sample-weighted metrics over a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Pooled RMSE
    pub rmse: f64,
    /// Pooled MAE
    pub mae: f64,
    /// Total samples
    pub n: usize,
}

impl WindowMetrics {
    /// Pool metric rows weighted by their sample counts.
    ///
    /// `mae = Σ nᵢ·maeᵢ / Σ nᵢ` and `rmse = sqrt(Σ nᵢ·rmseᵢ² / Σ nᵢ)`.
    /// Returns `None` when the rows hold no samples.
    pub fn pool(records: &[ModelMetricsRecord]) -> Option<Self> {
        let usable = records
            .iter()
            .filter(|r| r.n > 0 && r.rmse.is_finite() && r.mae.is_finite());
        let (n, abs_sum, sq_sum) = usable.fold((0usize, 0.0, 0.0), |(n, a, s), r| {
            let w = r.n as f64;
            (n + r.n, a + w * r.mae, s + w * r.rmse * r.rmse)
        });
        (n > 0).then(|| Self {
            rmse: (sq_sum / n as f64).sqrt(),
            mae: abs_sum / n as f64,
            n,
        })
    }
}

/// Relative improvement of `now` over `past`; 0 when `past <= 0`.
pub fn relative_improvement(past: f64, now: f64) -> f64 {
    if past <= 0.0 { 0.0 } else { (past - now) / past }
}

/// Result of considering a challenger.
#[derive(Debug, Clone, PartialEq)]
pub enum PromotionOutcome {
    /// No champion existed; the challenger became champion
    FirstChampion {
        /// New champion row
        champion: ModelRecord,
    },
    /// The challenger replaced the champion
    Promoted {
        /// New champion row
        champion: ModelRecord,
        /// Metrics of the replaced champion
        previous: WindowMetrics,
        /// Metrics of the challenger
        challenger: WindowMetrics,
    },
    /// The champion was kept
    Retained {
        /// Run identifier of the champion
        champion_run: String,
        /// Metrics of the champion
        current: WindowMetrics,
        /// Metrics of the challenger
        challenger: WindowMetrics,
    },
    /// No decision could be made; the champion was kept
    Skipped {
        /// Why
        reason: String,
    },
}

impl PromotionOutcome {
    /// Whether the challenger became champion.
    pub const fn is_promotion(&self) -> bool {
        matches!(self, Self::FirstChampion { .. } | Self::Promoted { .. })
    }
}

/// Decides and applies champion changes.
#[derive(Debug, Clone, Default)]
pub struct PromotionEngine {
    config: PromotionConfig,
}

impl PromotionEngine {
    /// Create a new engine.
    pub fn new(config: PromotionConfig) -> Result<Self> {
        if !config.threshold.is_finite() || config.threshold < 0.0 {
            return Err(RegistryError::InvalidParameter(format!(
                "promotion threshold must be finite and non-negative, got {}",
                config.threshold
            )));
        }
        if config.window_days <= 0 {
            return Err(RegistryError::InvalidParameter(format!(
                "promotion window must be positive, got {} days",
                config.window_days
            )));
        }
        Ok(Self { config })
    }

    /// Whether a challenger with `challenger` metrics beats `current`.
    pub fn beats(&self, current: &WindowMetrics, challenger: &WindowMetrics) -> bool {
        let rmse_gain = relative_improvement(current.rmse, challenger.rmse);
        let mae_gain = relative_improvement(current.mae, challenger.mae);
        rmse_gain > self.config.threshold && mae_gain > self.config.threshold
    }

    fn window_metrics(
        &self,
        store: &SqliteStore,
        run_identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<WindowMetrics>> {
        let since = now - Duration::days(self.config.window_days);
        let records = store.get_model_metrics_since(run_identifier, since)?;
        Ok(WindowMetrics::pool(&records))
    }

    /// Consider `challenger_run` for the champion slot of `name`.
    pub fn consider(
        &self,
        store: &SqliteStore,
        name: &str,
        challenger_run: &str,
        now: DateTime<Utc>,
    ) -> Result<PromotionOutcome> {
        let Some(current) = store.get_champion(name)? else {
            return Ok(match store.swap_champion(name, None, challenger_run, now)? {
                Some(champion) => {
                    info!(name, run_id = challenger_run, "first champion");
                    PromotionOutcome::FirstChampion { champion }
                }
                None => skipped(name, "champion appeared concurrently"),
            });
        };

        if current.run_identifier == challenger_run {
            return Ok(skipped(name, "challenger is already champion"));
        }

        let metrics = (
            self.window_metrics(store, &current.run_identifier, now)?,
            self.window_metrics(store, challenger_run, now)?,
        );
        let (Some(current_metrics), Some(challenger_metrics)) = metrics else {
            return Ok(skipped(name, "missing comparison metrics"));
        };

        if !self.beats(&current_metrics, &challenger_metrics) {
            debug!(
                name,
                champion_rmse = current_metrics.rmse,
                challenger_rmse = challenger_metrics.rmse,
                "champion retained"
            );
            return Ok(PromotionOutcome::Retained {
                champion_run: current.run_identifier,
                current: current_metrics,
                challenger: challenger_metrics,
            });
        }

        Ok(
            match store.swap_champion(name, Some(current.id), challenger_run, now)? {
                Some(champion) => {
                    info!(
                        name,
                        run_id = challenger_run,
                        rmse = challenger_metrics.rmse,
                        mae = challenger_metrics.mae,
                        "challenger promoted"
                    );
                    PromotionOutcome::Promoted {
                        champion,
                        previous: current_metrics,
                        challenger: challenger_metrics,
                    }
                }
                None => skipped(name, "champion changed concurrently"),
            },
        )
    }
}

fn skipped(name: &str, reason: &str) -> PromotionOutcome {
    info!(name, reason, "promotion skipped");
    PromotionOutcome::Skipped {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use rstest::rstest;
    use stratus_data::Variable;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap()
    }

    fn metrics(run: &str, days_ago: i64, rmse: f64, mae: f64, n: usize) -> ModelMetricsRecord {
        ModelMetricsRecord {
            run_identifier: run.to_string(),
            name: "temp_2m_h24".to_string(),
            variable: Variable::Temperature2m,
            horizon_hours: 24,
            recorded_at: now() - Duration::days(days_ago),
            rmse,
            mae,
            n,
        }
    }

    fn store_with_champion(rmse: f64, mae: f64) -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.put_model_metrics(&metrics("champ", 1, rmse, mae, 100)).unwrap();
        let engine = PromotionEngine::default();
        let first = engine.consider(&store, "temp_2m_h24", "champ", now()).unwrap();
        assert!(matches!(first, PromotionOutcome::FirstChampion { .. }));
        store
    }

    #[test]
    fn test_relative_improvement() {
        assert_relative_eq!(relative_improvement(2.0, 1.9), 0.05);
        assert_relative_eq!(relative_improvement(0.0, 1.0), 0.0);
        assert_relative_eq!(relative_improvement(-1.0, -2.0), 0.0);
    }

    #[test]
    fn test_pool_weights_by_samples() {
        let pooled = WindowMetrics::pool(&[
            metrics("a", 1, 1.0, 1.0, 1),
            metrics("a", 2, 3.0, 2.0, 3),
        ])
        .unwrap();
        assert_eq!(pooled.n, 4);
        assert_relative_eq!(pooled.mae, 7.0 / 4.0);
        assert_relative_eq!(pooled.rmse, (28.0_f64 / 4.0).sqrt());
        assert!(WindowMetrics::pool(&[metrics("a", 1, 1.0, 1.0, 0)]).is_none());
    }

    #[rstest]
    #[case(1.9, 0.99, false)]
    #[case(1.9, 0.97, true)]
    #[case(1.99, 0.5, false)]
    #[case(2.5, 1.5, false)]
    fn test_promotion_requires_both_metrics(
        #[case] rmse: f64,
        #[case] mae: f64,
        #[case] promoted: bool,
    ) {
        let store = store_with_champion(2.0, 1.0);
        store.put_model_metrics(&metrics("chal", 0, rmse, mae, 100)).unwrap();

        let outcome = PromotionEngine::default()
            .consider(&store, "temp_2m_h24", "chal", now())
            .unwrap();
        assert_eq!(outcome.is_promotion(), promoted);

        let champion = store.get_champion("temp_2m_h24").unwrap().unwrap();
        let expected = if promoted { "chal" } else { "champ" };
        assert_eq!(champion.run_identifier, expected);
    }

    #[test]
    fn test_missing_metrics_skip() {
        let store = store_with_champion(2.0, 1.0);
        let outcome = PromotionEngine::default()
            .consider(&store, "temp_2m_h24", "chal", now())
            .unwrap();
        assert!(matches!(outcome, PromotionOutcome::Skipped { .. }));
        assert_eq!(
            store.get_champion("temp_2m_h24").unwrap().unwrap().run_identifier,
            "champ"
        );
    }

    #[test]
    fn test_metrics_outside_window_are_ignored() {
        let store = store_with_champion(2.0, 1.0);
        store.put_model_metrics(&metrics("chal", 8, 0.1, 0.1, 100)).unwrap();
        let outcome = PromotionEngine::default()
            .consider(&store, "temp_2m_h24", "chal", now())
            .unwrap();
        assert!(matches!(outcome, PromotionOutcome::Skipped { .. }));
    }

    #[test]
    fn test_invalid_config() {
        let config = PromotionConfig {
            threshold: -0.1,
            window_days: 7,
        };
        assert!(PromotionEngine::new(config).is_err());
        let config = PromotionConfig {
            threshold: 0.02,
            window_days: 0,
        };
        assert!(PromotionEngine::new(config).is_err());
    }
}
