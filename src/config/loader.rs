//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
  let path = path.as_ref();

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.engine.name,
    trials = config.analysis.monte_carlo_trials,
    seed = config.analysis.monte_carlo_seed,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Fails on malformed TOML or an out-of-range parameter.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A non-empty engine name and a known log level
/// - Analysis parameter ranges
/// - Distinct candidate and history files
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.engine.name.trim().is_empty(),
    "engine.name must not be empty"
  );
  anyhow::ensure!(
    ["trace", "debug", "info", "warn", "error"]
      .contains(&config.engine.log_level.to_ascii_lowercase().as_str()),
    "engine.log_level must be one of trace/debug/info/warn/error, got {}",
    config.engine.log_level
  );

  config
    .analysis
    .validate()
    .context("Invalid [analysis] section")?;

  anyhow::ensure!(
    config.data.candidates_path != config.data.history_path,
    "data.candidates_path and data.history_path must differ"
  );

  Ok(())
}
