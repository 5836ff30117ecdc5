//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! All analysis thresholds are externalized here; the domain layer only
//! carries the documented defaults.

pub mod loader;

use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::error::{AnalyticsError, AnalyticsResult};
use crate::domain::optimizer::OptimizerLimits;
use crate::domain::scenario::{MonteCarloConfig, SamplingMethod};

/// Top-level application configuration.
///
/// Loaded from `config.toml` at startup. Every section has defaults, so
/// an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Engine identity and logging.
  #[serde(default)]
  pub engine: EngineConfig,
  /// Analysis thresholds.
  #[serde(default)]
  pub analysis: AnalysisConfig,
  /// Input file locations.
  #[serde(default)]
  pub data: DataConfig,
}

/// Engine identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Human-readable engine name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

/// Analysis parameters, immutable for the duration of a call.
///
/// Override individual fields with the `with_*` builders; the value is
/// never mutated in place by the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
  /// Per-period risk-free rate.
  pub risk_free_rate: f64,
  /// Largest share of total stake allowed in one position.
  pub max_single_bet_ratio: f64,
  pub max_positions: usize,
  /// Minimum number of distinct odds bands.
  pub min_diversification: usize,
  /// Band weight drift tolerated before rebalancing.
  pub rebalance_threshold: f64,
  pub monte_carlo_trials: usize,
  /// Levels for Monte Carlo confidence intervals, each in (0, 1).
  pub confidence_levels: Vec<f64>,
  /// Annualization factor.
  pub periods_per_year: f64,
  /// Rolling return window, in bets.
  pub rolling_window: usize,
  pub monte_carlo_seed: u64,
  pub monte_carlo_method: SamplingMethod,
  /// Fraction of wealth staked per simulated bet.
  pub simulation_stake_fraction: f64,
  /// Alpha for the significance tests.
  pub significance_level: f64,
  /// Kelly multiplier applied before the 25% cap (1.0 = full Kelly).
  pub kelly_multiplier: f64,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: 0.001,
      max_single_bet_ratio: 0.2,
      max_positions: 10,
      min_diversification: 3,
      rebalance_threshold: 0.1,
      monte_carlo_trials: 1000,
      confidence_levels: vec![0.95, 0.99],
      periods_per_year: 252.0,
      rolling_window: 30,
      monte_carlo_seed: 42,
      monte_carlo_method: SamplingMethod::Bootstrap,
      simulation_stake_fraction: 0.02,
      significance_level: 0.05,
      kelly_multiplier: 1.0,
    }
  }
}

impl AnalysisConfig {
  /// Checks every parameter range.
  ///
  /// # Errors
  /// `InvalidConfig` naming the first offending field.
  pub fn validate(&self) -> AnalyticsResult<()> {
    fn check(ok: bool, message: impl FnOnce() -> String) -> AnalyticsResult<()> {
      if ok { Ok(()) } else { Err(AnalyticsError::invalid_config(message())) }
    }

    check(self.risk_free_rate.is_finite() && self.risk_free_rate > -1.0, || {
      format!("risk_free_rate must be finite and > -1, got {}", self.risk_free_rate)
    })?;
    check(
      self.max_single_bet_ratio > 0.0 && self.max_single_bet_ratio <= 1.0,
      || format!("max_single_bet_ratio must be in (0, 1], got {}", self.max_single_bet_ratio),
    )?;
    check(self.max_positions > 0, || "max_positions must be positive".to_string())?;
    check(
      (1..=6).contains(&self.min_diversification),
      || format!("min_diversification must be in [1, 6], got {}", self.min_diversification),
    )?;
    check(
      self.rebalance_threshold >= 0.0 && self.rebalance_threshold < 1.0,
      || format!("rebalance_threshold must be in [0, 1), got {}", self.rebalance_threshold),
    )?;
    check(self.monte_carlo_trials > 0, || "monte_carlo_trials must be positive".to_string())?;
    check(
      self.confidence_levels.iter().all(|c| *c > 0.0 && *c < 1.0),
      || format!("confidence_levels must each be in (0, 1), got {:?}", self.confidence_levels),
    )?;
    check(self.periods_per_year > 0.0, || {
      format!("periods_per_year must be positive, got {}", self.periods_per_year)
    })?;
    check(self.rolling_window > 0, || "rolling_window must be positive".to_string())?;
    check(
      self.simulation_stake_fraction > 0.0 && self.simulation_stake_fraction <= 1.0,
      || {
        format!(
          "simulation_stake_fraction must be in (0, 1], got {}",
          self.simulation_stake_fraction
        )
      },
    )?;
    check(
      self.significance_level > 0.0 && self.significance_level < 1.0,
      || format!("significance_level must be in (0, 1), got {}", self.significance_level),
    )?;
    check(
      self.kelly_multiplier > 0.0 && self.kelly_multiplier <= 1.0,
      || format!("kelly_multiplier must be in (0, 1], got {}", self.kelly_multiplier),
    )
  }

  #[must_use]
  pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
    self.risk_free_rate = rate;
    self
  }

  #[must_use]
  pub fn with_max_single_bet_ratio(mut self, ratio: f64) -> Self {
    self.max_single_bet_ratio = ratio;
    self
  }

  #[must_use]
  pub fn with_max_positions(mut self, max: usize) -> Self {
    self.max_positions = max;
    self
  }

  #[must_use]
  pub fn with_min_diversification(mut self, bands: usize) -> Self {
    self.min_diversification = bands;
    self
  }

  #[must_use]
  pub fn with_rebalance_threshold(mut self, threshold: f64) -> Self {
    self.rebalance_threshold = threshold;
    self
  }

  #[must_use]
  pub fn with_monte_carlo_trials(mut self, trials: usize) -> Self {
    self.monte_carlo_trials = trials;
    self
  }

  #[must_use]
  pub fn with_confidence_levels(mut self, levels: Vec<f64>) -> Self {
    self.confidence_levels = levels;
    self
  }

  #[must_use]
  pub fn with_monte_carlo_seed(mut self, seed: u64) -> Self {
    self.monte_carlo_seed = seed;
    self
  }

  #[must_use]
  pub fn with_monte_carlo_method(mut self, method: SamplingMethod) -> Self {
    self.monte_carlo_method = method;
    self
  }

  #[must_use]
  pub fn with_kelly_multiplier(mut self, multiplier: f64) -> Self {
    self.kelly_multiplier = multiplier;
    self
  }

  /// Optimizer limits derived from this configuration.
  pub const fn optimizer_limits(&self) -> OptimizerLimits {
    OptimizerLimits {
      max_single_bet_ratio: self.max_single_bet_ratio,
      max_positions: self.max_positions,
      min_diversification: self.min_diversification,
      rebalance_threshold: self.rebalance_threshold,
    }
  }

  /// Monte Carlo settings derived from this configuration.
  pub fn monte_carlo(&self) -> MonteCarloConfig {
    MonteCarloConfig {
      trials: self.monte_carlo_trials,
      horizon: None,
      stake_fraction: self.simulation_stake_fraction,
      seed: self.monte_carlo_seed,
      method: self.monte_carlo_method,
      confidence_levels: self.confidence_levels.clone(),
    }
  }
}

/// Input file configuration for the JSONL store.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
  /// Candidate wagers, one JSON object per line.
  #[serde(default = "default_candidates_path")]
  pub candidates_path: PathBuf,
  /// Settled outcomes, one JSON object per line.
  #[serde(default = "default_history_path")]
  pub history_path: PathBuf,
  /// Optional benchmark return series, one number per line.
  #[serde(default)]
  pub benchmark_path: Option<PathBuf>,
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      candidates_path: default_candidates_path(),
      history_path: default_history_path(),
      benchmark_path: None,
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "portfolio-analytics".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_candidates_path() -> PathBuf {
  PathBuf::from("data/candidates.jsonl")
}

fn default_history_path() -> PathBuf {
  PathBuf::from("data/history.jsonl")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_are_valid() {
    let config = AnalysisConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.monte_carlo_trials, 1000);
    assert_eq!(config.confidence_levels, vec![0.95, 0.99]);
    assert_eq!(config.optimizer_limits(), OptimizerLimits::default());
  }

  #[test]
  fn test_builders_do_not_touch_other_fields() {
    let base = AnalysisConfig::default();
    let tuned = base.clone().with_monte_carlo_trials(50).with_monte_carlo_seed(7);
    assert_eq!(tuned.monte_carlo_trials, 50);
    assert_eq!(tuned.monte_carlo().seed, 7);
    assert_eq!(tuned.risk_free_rate, base.risk_free_rate);
    assert_eq!(base.monte_carlo_trials, 1000);
  }

  #[test]
  fn test_validate_rejects_out_of_range() {
    let bad = AnalysisConfig::default().with_max_single_bet_ratio(1.5);
    let err = bad.validate().unwrap_err();
    assert!(err.to_string().contains("max_single_bet_ratio"));

    assert!(AnalysisConfig::default().with_monte_carlo_trials(0).validate().is_err());
    assert!(AnalysisConfig::default().with_confidence_levels(vec![0.95, 1.0]).validate().is_err());
    assert!(AnalysisConfig::default().with_min_diversification(7).validate().is_err());
  }

  #[test]
  fn test_partial_toml_uses_defaults() {
    let config: AppConfig = toml::from_str(
      r#"
      [analysis]
      monte_carlo_trials = 200
      monte_carlo_method = "NORMAL"
      "#,
    )
    .unwrap();
    assert_eq!(config.analysis.monte_carlo_trials, 200);
    assert_eq!(config.analysis.monte_carlo_method, SamplingMethod::Normal);
    assert_eq!(config.analysis.rolling_window, 30);
    assert_eq!(config.engine.log_level, "info");
    assert!(config.data.benchmark_path.is_none());
  }
}
