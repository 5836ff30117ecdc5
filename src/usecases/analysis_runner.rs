//! Analysis Runner - Port-driven Analysis Workflow
//!
//! Fetches candidates, history and the optional benchmark from the
//! supplier ports concurrently, then runs the CPU-bound analysis on the
//! blocking pool so the async runtime is never stalled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::domain::scenario::SimulationBudget;
use crate::ports::{CandidateSource, HistorySource};

use super::portfolio_analyzer::{PortfolioAnalysis, PortfolioAnalyzer};

/// Runs one analysis per call over injected supplier ports.
pub struct AnalysisRunner<C: CandidateSource, H: HistorySource> {
  /// Candidate wager supplier.
  candidates: Arc<C>,
  /// Settled outcome and benchmark supplier.
  history: Arc<H>,
  analyzer: Arc<PortfolioAnalyzer>,
  /// Wall-clock limit for the Monte Carlo stage.
  simulation_timeout: Option<Duration>,
}

impl<C: CandidateSource, H: HistorySource> AnalysisRunner<C, H> {
  pub fn new(candidates: Arc<C>, history: Arc<H>, analyzer: PortfolioAnalyzer) -> Self {
    Self {
      candidates,
      history,
      analyzer: Arc::new(analyzer),
      simulation_timeout: None,
    }
  }

  /// Bound the Monte Carlo stage by wall-clock time.
  #[must_use]
  pub const fn with_simulation_timeout(mut self, timeout: Duration) -> Self {
    self.simulation_timeout = Some(timeout);
    self
  }

  /// Fetch inputs and run a full analysis.
  ///
  /// # Errors
  /// Fails when a port fails or the history holds an invalid outcome.
  #[instrument(skip(self), name = "analysis_run")]
  pub async fn run(&self) -> Result<PortfolioAnalysis> {
    let budget = self
      .simulation_timeout
      .map_or_else(SimulationBudget::unbounded, SimulationBudget::with_timeout);
    self.run_with_budget(budget).await
  }

  /// Like [`Self::run`], with a caller-owned cancellation budget.
  ///
  /// # Errors
  /// Fails when a port fails or the history holds an invalid outcome.
  pub async fn run_with_budget(&self, budget: SimulationBudget) -> Result<PortfolioAnalysis> {
    let started = Instant::now();

    let (candidates, outcomes, benchmark) = tokio::try_join!(
      async {
        self
          .candidates
          .fetch_candidates()
          .await
          .context("Failed to fetch candidates")
      },
      async {
        self
          .history
          .fetch_outcomes()
          .await
          .context("Failed to fetch history")
      },
      async {
        self
          .history
          .fetch_benchmark()
          .await
          .context("Failed to fetch benchmark")
      },
    )?;

    info!(
      candidates = candidates.len(),
      outcomes = outcomes.len(),
      benchmark = benchmark.as_ref().map_or(0, Vec::len),
      "Inputs fetched"
    );

    let analyzer = Arc::clone(&self.analyzer);
    let analysis = tokio::task::spawn_blocking(move || {
      analyzer.analyze_portfolio_with_budget(
        &candidates,
        &outcomes,
        benchmark.as_deref(),
        &budget,
      )
    })
    .await
    .context("Analysis task panicked")?
    .context("Portfolio analysis failed")?;

    info!(
      status = %analysis.status,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "Analysis run finished"
    );
    Ok(analysis)
  }
}
