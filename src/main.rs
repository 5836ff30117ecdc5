//! Betting Portfolio Analytics — Entry Point
//!
//! Loads configuration, wires the JSONL store into the analysis runner and
//! prints the full analysis as JSON on stdout. Logs go to stderr.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first argument) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create JsonlStore (implements both supplier ports)
//! 4. Create PortfolioAnalyzer from [analysis]
//! 5. Run AnalysisRunner, cancelling the simulation on SIGINT
//! 6. Print the report

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use betting_portfolio_analytics::adapters::persistence::JsonlStore;
use betting_portfolio_analytics::config::{self, AppConfig};
use betting_portfolio_analytics::domain::scenario::SimulationBudget;
use betting_portfolio_analytics::usecases::{AnalysisRunner, PortfolioAnalyzer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        config::loader::load_config(&config_path).context("Failed to load configuration")?
    } else {
        AppConfig::default()
    };

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.engine.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    if !config_found {
        warn!(path = %config_path, "Config file not found, using defaults");
    }
    info!(
        name = %config.engine.name,
        version = env!("CARGO_PKG_VERSION"),
        trials = config.analysis.monte_carlo_trials,
        "Starting portfolio analytics"
    );

    // ── 3-4. Wire store and analyzer ────────────────────────
    let store = Arc::new(JsonlStore::from_config(&config.data));
    let analyzer =
        PortfolioAnalyzer::new(config.analysis.clone()).context("Invalid analysis configuration")?;
    let runner = AnalysisRunner::new(Arc::clone(&store), store, analyzer);

    // ── 5. Run, cancelling the simulation on SIGINT ─────────
    let budget = SimulationBudget::unbounded();
    let cancel = budget.cancel_flag();
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("SIGINT received, cancelling remaining simulation trials");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let analysis = runner.run_with_budget(budget).await;
    ctrl_c.abort();
    let analysis = analysis?;

    // ── 6. Print report ─────────────────────────────────────
    let report = serde_json::to_string_pretty(&analysis).context("Failed to serialize report")?;
    println!("{report}");

    info!(status = %analysis.status, "Done");
    Ok(())
}
