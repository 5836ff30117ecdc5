//! Portfolio Analyzer - End-to-end Analysis Pipeline
//!
//! Runs the engines in dependency order:
//! 1. Evaluate every candidate (EV, Kelly, efficiency, tier, warnings)
//! 2. Fold settled history into a snapshot
//! 3. Derive risk, return and risk-adjusted metrics
//! 4. Optimize the candidate portfolio and run scenarios
//! 5. Test the historical edge for significance
//! 6. Synthesize ranked recommendations
//!
//! Each call builds fresh results from its inputs; the analyzer holds only
//! immutable configuration.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::AnalysisConfig;
use crate::domain::bet::{BetCandidate, BetEvaluation};
use crate::domain::error::{AnalyticsResult, DataGap};
use crate::domain::evaluator::BetEvaluator;
use crate::domain::kelly::{KellyCriterion, MAX_KELLY_FRACTION};
use crate::domain::optimizer::{OptimizationReport, PortfolioOptimizer};
use crate::domain::performance::{PerformanceEngine, RiskAdjustedMetrics};
use crate::domain::recommendation::{
  Recommendation, RecommendationContext, RecommendationSynthesizer,
};
use crate::domain::returns::{ReturnMetrics, ReturnMetricsEngine};
use crate::domain::risk::{RiskMetricsEngine, RiskProfile};
use crate::domain::scenario::{ScenarioAnalysis, ScenarioEngine, SimulationBudget};
use crate::domain::snapshot::{HistoricalOutcome, PortfolioSnapshot};
use crate::domain::statistics::SignificanceReport;

/// How much of the pipeline ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
  /// Candidates and history were both analysed.
  Complete,
  /// No settled history: candidates evaluated and optimized only.
  EvaluationOnly,
  /// Nothing to analyse.
  EmptyPortfolio,
}

impl std::fmt::Display for AnalysisStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Self::Complete => "COMPLETE",
      Self::EvaluationOnly => "EVALUATION_ONLY",
      Self::EmptyPortfolio => "EMPTY_PORTFOLIO",
    };
    write!(f, "{s}")
  }
}

/// A candidate that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedCandidate {
  /// Position in the input batch.
  pub index: usize,
  pub label: Option<String>,
  pub reason: String,
}

/// Full analysis output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAnalysis {
  pub status: AnalysisStatus,
  /// Evaluations of the valid candidates, in input order.
  pub evaluations: Vec<BetEvaluation>,
  pub rejected: Vec<RejectedCandidate>,
  pub snapshot: Option<PortfolioSnapshot>,
  pub risk_profile: Option<RiskProfile>,
  pub return_metrics: Option<ReturnMetrics>,
  pub risk_adjusted_metrics: Option<RiskAdjustedMetrics>,
  pub optimization: Option<OptimizationReport>,
  pub scenarios: Option<ScenarioAnalysis>,
  pub significance: Option<SignificanceReport>,
  pub recommendations: Vec<Recommendation>,
  /// Every data gap reported by the engines.
  pub data_gaps: Vec<DataGap>,
}

impl PortfolioAnalysis {
  fn empty(rejected: Vec<RejectedCandidate>) -> Self {
    Self {
      status: AnalysisStatus::EmptyPortfolio,
      evaluations: Vec::new(),
      rejected,
      snapshot: None,
      risk_profile: None,
      return_metrics: None,
      risk_adjusted_metrics: None,
      optimization: None,
      scenarios: None,
      significance: None,
      recommendations: Vec::new(),
      data_gaps: Vec::new(),
    }
  }
}

/// Stateless orchestrator over the domain engines.
#[derive(Debug, Clone)]
pub struct PortfolioAnalyzer {
  config: AnalysisConfig,
  evaluator: BetEvaluator,
  optimizer: PortfolioOptimizer,
  risk: RiskMetricsEngine,
  returns: ReturnMetricsEngine,
  performance: PerformanceEngine,
  scenarios: ScenarioEngine,
  synthesizer: RecommendationSynthesizer,
}

impl Default for PortfolioAnalyzer {
  fn default() -> Self {
    Self::build(AnalysisConfig::default())
  }
}

impl PortfolioAnalyzer {
  /// Create an analyzer from a validated configuration.
  ///
  /// # Errors
  /// `InvalidConfig` when a parameter is out of range.
  pub fn new(config: AnalysisConfig) -> AnalyticsResult<Self> {
    config.validate()?;
    Ok(Self::build(config))
  }

  fn build(config: AnalysisConfig) -> Self {
    let periods = config.periods_per_year;
    Self {
      evaluator: BetEvaluator::new(KellyCriterion::new(
        config.kelly_multiplier,
        MAX_KELLY_FRACTION,
      )),
      optimizer: PortfolioOptimizer::new(config.optimizer_limits()),
      risk: RiskMetricsEngine::new(periods),
      returns: ReturnMetricsEngine::new(periods, config.risk_free_rate, config.rolling_window),
      performance: PerformanceEngine::new(periods),
      scenarios: ScenarioEngine::new(periods, config.monte_carlo()),
      synthesizer: RecommendationSynthesizer::new(config.significance_level),
      config,
    }
  }

  pub const fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  /// Evaluate one candidate. Pure: identical input gives identical output.
  ///
  /// # Errors
  /// `InvalidCandidate` when the candidate breaks an input invariant.
  pub fn evaluate_single_bet(&self, candidate: &BetCandidate) -> AnalyticsResult<BetEvaluation> {
    self.evaluator.evaluate(candidate)
  }

  /// Analyse a portfolio with an unbounded Monte Carlo budget.
  ///
  /// # Errors
  /// See [`Self::analyze_portfolio_with_budget`].
  pub fn analyze_portfolio(
    &self,
    candidates: &[BetCandidate],
    history: &[HistoricalOutcome],
    benchmark: Option<&[f64]>,
  ) -> AnalyticsResult<PortfolioAnalysis> {
    self.analyze_portfolio_with_budget(
      candidates,
      history,
      benchmark,
      &SimulationBudget::unbounded(),
    )
  }

  /// Analyse candidates against settled history.
  ///
  /// Invalid candidates are reported in `rejected` and excluded. The
  /// benchmark must be aligned with `history` sorted by timestamp.
  ///
  /// # Errors
  /// `InvalidOutcome` when a history record breaks an input invariant.
  #[instrument(skip_all, fields(candidates = candidates.len(), history = history.len()))]
  pub fn analyze_portfolio_with_budget(
    &self,
    candidates: &[BetCandidate],
    history: &[HistoricalOutcome],
    benchmark: Option<&[f64]>,
    budget: &SimulationBudget,
  ) -> AnalyticsResult<PortfolioAnalysis> {
    let (valid, evaluations, rejected) = self.evaluate_candidates(candidates);
    if !rejected.is_empty() {
      warn!(rejected = rejected.len(), "Excluded invalid candidates");
    }

    if evaluations.is_empty() && history.is_empty() {
      info!("Nothing to analyse, returning empty portfolio");
      return Ok(PortfolioAnalysis::empty(rejected));
    }

    let optimization = (!evaluations.is_empty()).then(|| {
      let positions: Vec<_> = valid.iter().copied().zip(evaluations.iter()).collect();
      self.optimizer.optimize(&positions)
    });
    debug!(positions = evaluations.len(), "Optimizer finished");

    if history.is_empty() {
      let recommendations = self.synthesizer.synthesize(&RecommendationContext {
        evaluations: &evaluations,
        optimization: optimization.as_ref(),
        ..RecommendationContext::default()
      });
      info!(
        evaluations = evaluations.len(),
        recommendations = recommendations.len(),
        "Evaluation-only analysis complete"
      );
      return Ok(PortfolioAnalysis {
        status: AnalysisStatus::EvaluationOnly,
        evaluations,
        rejected,
        optimization,
        recommendations,
        ..PortfolioAnalysis::empty(Vec::new())
      });
    }

    let snapshot = PortfolioSnapshot::from_outcomes(history)?;
    let risk_profile = self.risk.compute(&snapshot, benchmark);
    let return_metrics = self.returns.compute(&snapshot);
    let risk_adjusted =
      self
        .performance
        .compute(&snapshot.returns, &return_metrics, &risk_profile, benchmark);
    debug!(
      sharpe = risk_adjusted.sharpe_ratio,
      risk_level = %risk_profile.risk_level,
      "Risk and performance computed"
    );

    let scenarios = self.scenarios.analyze(&snapshot, budget)?;
    if scenarios.monte_carlo.cancelled {
      warn!(
        completed = scenarios.monte_carlo.completed_trials,
        requested = scenarios.monte_carlo.requested_trials,
        "Monte Carlo stopped early"
      );
    }
    let significance = SignificanceReport::from_returns(&snapshot.returns);

    let recommendations = self.synthesizer.synthesize(&RecommendationContext {
      evaluations: &evaluations,
      risk: Some(&risk_profile),
      performance: Some(&risk_adjusted),
      optimization: optimization.as_ref(),
      scenarios: Some(&scenarios),
      significance: Some(&significance),
    });

    let data_gaps: Vec<DataGap> = snapshot
      .data_gaps
      .iter()
      .chain(&risk_profile.data_gaps)
      .chain(&return_metrics.data_gaps)
      .chain(&scenarios.monte_carlo.data_gaps)
      .chain(&significance.data_gaps)
      .cloned()
      .collect();

    info!(
      evaluations = evaluations.len(),
      observations = snapshot.observations,
      risk_level = %risk_profile.risk_level,
      score = risk_adjusted.overall_score,
      recommendations = recommendations.len(),
      "Portfolio analysis complete"
    );

    Ok(PortfolioAnalysis {
      status: AnalysisStatus::Complete,
      evaluations,
      rejected,
      snapshot: Some(snapshot),
      risk_profile: Some(risk_profile),
      return_metrics: Some(return_metrics),
      risk_adjusted_metrics: Some(risk_adjusted),
      optimization,
      scenarios: Some(scenarios),
      significance: Some(significance),
      recommendations,
      data_gaps,
    })
  }

  /// Split candidates into valid ones (with evaluations) and rejections.
  fn evaluate_candidates<'a>(
    &self,
    candidates: &'a [BetCandidate],
  ) -> (Vec<&'a BetCandidate>, Vec<BetEvaluation>, Vec<RejectedCandidate>) {
    let mut valid = Vec::new();
    let mut evaluations = Vec::new();
    let mut rejected = Vec::new();

    let results = self.evaluator.evaluate_batch(candidates);
    for (index, (candidate, result)) in candidates.iter().zip(results).enumerate() {
      match result {
        Ok(evaluation) => {
          valid.push(candidate);
          evaluations.push(evaluation);
        }
        Err(e) => rejected.push(RejectedCandidate {
          index,
          label: candidate.label.clone(),
          reason: e.to_string(),
        }),
      }
    }
    (valid, evaluations, rejected)
  }
}
