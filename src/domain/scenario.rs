//! Scenario engine.
//!
//! Stress tests shock historical returns with fixed multipliers and
//! recompute the risk profile. Monte Carlo projects terminal wealth by
//! resampling returns (bootstrap) or drawing from a fitted normal, staking
//! a fixed fraction of wealth per bet.
//!
//! Each trial owns an RNG seeded from `(seed, trial index)`, so results do
//! not depend on how rayon schedules the work. Trials run in parallel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult, DataGap};
use super::risk::{self, RiskLevel, RiskMetricsEngine};
use super::snapshot::PortfolioSnapshot;
use super::statistics;

/// Mixes the trial index into the base seed.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

// ────────────────────────────────────────────────────────────────
// Stress tests
// ────────────────────────────────────────────────────────────────

/// Fixed shock applied to every historical return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    /// Multiplier on positive returns.
    pub gain_multiplier: f64,
    /// Multiplier on negative returns (result clamped to −1).
    pub loss_multiplier: f64,
}

impl StressScenario {
    pub fn new(name: impl Into<String>, gain_multiplier: f64, loss_multiplier: f64) -> Self {
        Self {
            name: name.into(),
            gain_multiplier,
            loss_multiplier,
        }
    }

    /// Built-in scenario set.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("mild_downturn", 0.9, 1.1),
            Self::new("severe_downturn", 0.5, 1.5),
            Self::new("payout_haircut", 0.8, 1.0),
            Self::new("upside_surge", 1.5, 1.0),
        ]
    }

    fn shock(&self, r: f64) -> f64 {
        if r > 0.0 {
            r * self.gain_multiplier
        } else {
            r * self.loss_multiplier
        }
    }
}

/// Risk profile summary under one stress scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressTestResult {
    pub scenario: String,
    pub mean_return: f64,
    /// Stake-weighted return of the shocked history.
    pub total_return: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    pub risk_level: RiskLevel,
}

// ────────────────────────────────────────────────────────────────
// Monte Carlo
// ────────────────────────────────────────────────────────────────

/// How per-bet returns are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SamplingMethod {
    /// Resample historical returns with replacement.
    #[default]
    Bootstrap,
    /// Draw from a normal fitted to the historical mean and std dev.
    Normal,
}

/// Monte Carlo settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    pub trials: usize,
    /// Bets per trial; `None` uses the history length.
    pub horizon: Option<usize>,
    /// Fraction of current wealth staked on each simulated bet.
    pub stake_fraction: f64,
    pub seed: u64,
    pub method: SamplingMethod,
    pub confidence_levels: Vec<f64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            horizon: None,
            stake_fraction: 0.02,
            seed: 42,
            method: SamplingMethod::Bootstrap,
            confidence_levels: vec![0.95, 0.99],
        }
    }
}

/// Cancellation flag plus an optional wall-clock deadline.
///
/// Trials check the budget before starting; a trial already running is
/// allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct SimulationBudget {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SimulationBudget {
    /// No deadline, not cancelled.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Shared handle; storing `true` stops further trials.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_exhausted(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// One percentile of the terminal wealth distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileOutcome {
    pub percentile: f64,
    /// Wealth relative to a starting value of 1.0.
    pub terminal_wealth: f64,
    pub total_return: f64,
}

impl PercentileOutcome {
    fn at(sorted_wealth: &[f64], percentile: f64) -> Self {
        let terminal_wealth = statistics::quantile_sorted(sorted_wealth, percentile / 100.0);
        Self {
            percentile,
            terminal_wealth,
            total_return: terminal_wealth - 1.0,
        }
    }
}

/// Two-sided interval on the terminal return.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Distribution summary; absent when no trial completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub worst_case: PercentileOutcome,
    pub expected_case: PercentileOutcome,
    pub best_case: PercentileOutcome,
    pub mean_terminal_wealth: f64,
    pub probability_of_loss: f64,
    /// 95% VaR of the terminal return.
    pub var_95: f64,
    pub cvar_95: f64,
    pub confidence_intervals: Vec<ConfidenceInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloResult {
    pub method: SamplingMethod,
    pub seed: u64,
    pub horizon: usize,
    pub requested_trials: usize,
    pub completed_trials: usize,
    /// The budget ran out before every trial started.
    pub cancelled: bool,
    pub summary: Option<SimulationSummary>,
    pub data_gaps: Vec<DataGap>,
}

/// Stress tests plus Monte Carlo for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioAnalysis {
    pub stress_tests: Vec<StressTestResult>,
    /// Scenarios whose shocked history was not a valid portfolio.
    pub skipped_scenarios: Vec<String>,
    pub monte_carlo: MonteCarloResult,
}

// ────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScenarioEngine {
    risk: RiskMetricsEngine,
    scenarios: Vec<StressScenario>,
    monte_carlo: MonteCarloConfig,
}

impl ScenarioEngine {
    pub fn new(periods_per_year: f64, monte_carlo: MonteCarloConfig) -> Self {
        Self {
            risk: RiskMetricsEngine::new(periods_per_year),
            scenarios: StressScenario::defaults(),
            monte_carlo,
        }
    }

    /// Replaces the built-in stress scenarios.
    pub fn with_scenarios(mut self, scenarios: Vec<StressScenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub const fn monte_carlo_config(&self) -> &MonteCarloConfig {
        &self.monte_carlo
    }

    /// Runs every stress scenario and the Monte Carlo simulation.
    ///
    /// # Errors
    /// `InvalidConfig` for zero trials or a stake fraction outside (0, 1].
    pub fn analyze(
        &self,
        snapshot: &PortfolioSnapshot,
        budget: &SimulationBudget,
    ) -> AnalyticsResult<ScenarioAnalysis> {
        let (stress_tests, skipped_scenarios) = self.run_stress_tests(snapshot);
        Ok(ScenarioAnalysis {
            stress_tests,
            skipped_scenarios,
            monte_carlo: self.monte_carlo(snapshot, budget)?,
        })
    }

    /// Results for every scenario that yields a valid shocked history.
    pub fn stress_test(&self, snapshot: &PortfolioSnapshot) -> Vec<StressTestResult> {
        self.run_stress_tests(snapshot).0
    }

    /// Results plus the names of scenarios that could not be applied.
    fn run_stress_tests(&self, snapshot: &PortfolioSnapshot) -> (Vec<StressTestResult>, Vec<String>) {
        let mut results = Vec::with_capacity(self.scenarios.len());
        let mut skipped = Vec::new();
        for scenario in &self.scenarios {
            match snapshot.map_returns(|r| scenario.shock(r)) {
                Ok(shocked) => results.push(self.stress_result(scenario, &shocked)),
                Err(_) => skipped.push(scenario.name.clone()),
            }
        }
        (results, skipped)
    }

    fn stress_result(&self, scenario: &StressScenario, shocked: &PortfolioSnapshot) -> StressTestResult {
        let profile = self.risk.compute(shocked, None);
        StressTestResult {
            scenario: scenario.name.clone(),
            mean_return: shocked.mean_return,
            total_return: shocked.stake_weighted_return,
            volatility: profile.volatility,
            max_drawdown: profile.max_drawdown,
            var_95: profile.var_95,
            cvar_95: profile.cvar_95,
            risk_level: profile.risk_level,
        }
    }

    /// Simulates terminal wealth over `trials` independent paths.
    ///
    /// # Errors
    /// `InvalidConfig` for zero trials or a stake fraction outside (0, 1].
    pub fn monte_carlo(
        &self,
        snapshot: &PortfolioSnapshot,
        budget: &SimulationBudget,
    ) -> AnalyticsResult<MonteCarloResult> {
        let config = &self.monte_carlo;
        if config.trials == 0 {
            return Err(AnalyticsError::invalid_config("monte carlo needs at least one trial"));
        }
        if !(config.stake_fraction > 0.0 && config.stake_fraction <= 1.0) {
            return Err(AnalyticsError::invalid_config(format!(
                "simulation stake fraction {} must be in (0, 1]",
                config.stake_fraction
            )));
        }

        let horizon = config.horizon.unwrap_or(snapshot.observations).max(1);
        let sampler = Sampler::fit(config.method, &snapshot.returns);

        let wealth: Vec<Option<f64>> = (0..config.trials)
            .into_par_iter()
            .map(|trial| {
                if budget.is_exhausted() {
                    return None;
                }
                let mut rng = StdRng::seed_from_u64(trial_seed(config.seed, trial));
                Some(simulate_path(&sampler, &mut rng, horizon, config.stake_fraction))
            })
            .collect();
        let mut terminal: Vec<f64> = wealth.into_iter().flatten().collect();
        let completed_trials = terminal.len();

        let mut data_gaps = Vec::new();
        let summary = if terminal.is_empty() {
            data_gaps.push(DataGap::new("monte_carlo", config.trials, 0));
            None
        } else {
            terminal.sort_by(f64::total_cmp);
            Some(summarize(&terminal, &config.confidence_levels))
        };

        Ok(MonteCarloResult {
            method: config.method,
            seed: config.seed,
            horizon,
            requested_trials: config.trials,
            completed_trials,
            cancelled: completed_trials < config.trials,
            summary,
            data_gaps,
        })
    }
}

fn trial_seed(seed: u64, trial: usize) -> u64 {
    seed ^ (trial as u64).wrapping_add(1).wrapping_mul(SEED_STRIDE)
}

enum Sampler<'a> {
    Bootstrap(&'a [f64]),
    Normal { mean: f64, std_dev: f64 },
}

impl<'a> Sampler<'a> {
    fn fit(method: SamplingMethod, returns: &'a [f64]) -> Self {
        match method {
            SamplingMethod::Bootstrap => Self::Bootstrap(returns),
            SamplingMethod::Normal => Self::Normal {
                mean: statistics::mean(returns),
                std_dev: statistics::population_std_dev(returns),
            },
        }
    }

    fn draw(&self, rng: &mut StdRng) -> f64 {
        match self {
            Self::Bootstrap(returns) => returns[rng.gen_range(0..returns.len())],
            Self::Normal { mean, std_dev } => {
                // Box-Muller
                let u1: f64 = rng.r#gen::<f64>().max(1e-15);
                let u2: f64 = rng.r#gen();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                (mean + std_dev * z).max(-1.0)
            }
        }
    }
}

fn simulate_path(sampler: &Sampler<'_>, rng: &mut StdRng, horizon: usize, stake_fraction: f64) -> f64 {
    (0..horizon).fold(1.0, |wealth, _| wealth * (1.0 + stake_fraction * sampler.draw(rng)))
}

fn summarize(sorted_wealth: &[f64], confidence_levels: &[f64]) -> SimulationSummary {
    let n = sorted_wealth.len() as f64;
    let returns: Vec<f64> = sorted_wealth.iter().map(|w| w - 1.0).collect();

    let confidence_intervals = confidence_levels
        .iter()
        .map(|&level| ConfidenceInterval {
            level,
            lower: statistics::quantile_sorted(&returns, (1.0 - level) / 2.0),
            upper: statistics::quantile_sorted(&returns, (1.0 + level) / 2.0),
        })
        .collect();

    SimulationSummary {
        worst_case: PercentileOutcome::at(sorted_wealth, 5.0),
        expected_case: PercentileOutcome::at(sorted_wealth, 50.0),
        best_case: PercentileOutcome::at(sorted_wealth, 95.0),
        mean_terminal_wealth: statistics::mean(sorted_wealth),
        probability_of_loss: sorted_wealth.iter().filter(|&&w| w < 1.0).count() as f64 / n,
        var_95: risk::value_at_risk(&returns, 0.95),
        cvar_95: risk::conditional_value_at_risk(&returns, 0.95),
        confidence_intervals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PortfolioSnapshot {
        let returns = [1.5, -1.0, -1.0, 4.0, -1.0, 0.8, -1.0, 2.2, -1.0, -1.0];
        PortfolioSnapshot::from_returns(&[10.0; 10], &returns).unwrap()
    }

    fn engine(config: MonteCarloConfig) -> ScenarioEngine {
        ScenarioEngine::new(252.0, config)
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let e = engine(MonteCarloConfig::default());
        let a = e.monte_carlo(&snapshot(), &SimulationBudget::unbounded()).unwrap();
        let b = e.monte_carlo(&snapshot(), &SimulationBudget::unbounded()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.completed_trials, 1000);
        assert!(!a.cancelled);
    }

    #[test]
    fn test_thread_count_does_not_change_results() {
        let e = engine(MonteCarloConfig::default());
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let single = pool.install(|| e.monte_carlo(&snapshot(), &SimulationBudget::unbounded()).unwrap());
        let parallel = e.monte_carlo(&snapshot(), &SimulationBudget::unbounded()).unwrap();
        assert_eq!(single, parallel);
    }

    #[test]
    fn test_different_seed_differs() {
        let a = engine(MonteCarloConfig::default())
            .monte_carlo(&snapshot(), &SimulationBudget::unbounded())
            .unwrap();
        let b = engine(MonteCarloConfig { seed: 7, ..MonteCarloConfig::default() })
            .monte_carlo(&snapshot(), &SimulationBudget::unbounded())
            .unwrap();
        assert_ne!(a.summary, b.summary);
    }

    #[test]
    fn test_percentiles_are_ordered() {
        for method in [SamplingMethod::Bootstrap, SamplingMethod::Normal] {
            let config = MonteCarloConfig { method, ..MonteCarloConfig::default() };
            let result = engine(config)
                .monte_carlo(&snapshot(), &SimulationBudget::unbounded())
                .unwrap();
            let s = result.summary.unwrap();
            assert!(s.worst_case.terminal_wealth <= s.expected_case.terminal_wealth);
            assert!(s.expected_case.terminal_wealth <= s.best_case.terminal_wealth);
            assert!((0.0..=1.0).contains(&s.probability_of_loss));
            assert_eq!(s.confidence_intervals.len(), 2);
            let (ci95, ci99) = (&s.confidence_intervals[0], &s.confidence_intervals[1]);
            assert!(ci99.lower <= ci95.lower && ci95.upper <= ci99.upper);
        }
    }

    #[test]
    fn test_all_winning_history_never_loses() {
        let snap = PortfolioSnapshot::from_returns(&[5.0; 4], &[0.5, 1.0, 0.2, 0.9]).unwrap();
        let result = engine(MonteCarloConfig { trials: 200, ..MonteCarloConfig::default() })
            .monte_carlo(&snap, &SimulationBudget::unbounded())
            .unwrap();
        let s = result.summary.unwrap();
        assert_eq!(s.probability_of_loss, 0.0);
        assert!(s.worst_case.total_return > 0.0);
    }

    #[test]
    fn test_cancelled_budget_runs_nothing() {
        let budget = SimulationBudget::unbounded();
        budget.cancel_flag().store(true, Ordering::Relaxed);
        let result = engine(MonteCarloConfig::default())
            .monte_carlo(&snapshot(), &budget)
            .unwrap();
        assert_eq!(result.completed_trials, 0);
        assert!(result.cancelled);
        assert!(result.summary.is_none());
        assert_eq!(result.data_gaps, vec![DataGap::new("monte_carlo", 1000, 0)]);
    }

    #[test]
    fn test_expired_deadline_is_exhausted() {
        let budget = SimulationBudget::with_timeout(Duration::ZERO);
        assert!(budget.is_exhausted());
        assert!(!SimulationBudget::unbounded().is_exhausted());
    }

    #[test]
    fn test_rejects_bad_config() {
        let zero = engine(MonteCarloConfig { trials: 0, ..MonteCarloConfig::default() });
        assert!(matches!(
            zero.monte_carlo(&snapshot(), &SimulationBudget::unbounded()),
            Err(AnalyticsError::InvalidConfig { .. })
        ));
        let greedy = engine(MonteCarloConfig { stake_fraction: 1.5, ..MonteCarloConfig::default() });
        assert!(greedy.monte_carlo(&snapshot(), &SimulationBudget::unbounded()).is_err());
    }

    #[test]
    fn test_stress_scenarios() {
        let snap = PortfolioSnapshot::from_returns(&[10.0; 5], &[0.1, -0.2, 0.05, -0.1, 0.3]).unwrap();
        let results = engine(MonteCarloConfig::default()).stress_test(&snap);
        assert_eq!(results.len(), 4);

        let severe = results.iter().find(|r| r.scenario == "severe_downturn").unwrap();
        assert!(severe.mean_return < snap.mean_return);
        assert!(severe.max_drawdown <= 0.0);

        let surge = results.iter().find(|r| r.scenario == "upside_surge").unwrap();
        assert!(surge.mean_return > snap.mean_return);
    }

    #[test]
    fn test_custom_scenarios() {
        let e = engine(MonteCarloConfig::default())
            .with_scenarios(vec![StressScenario::new("wipeout", 0.0, 10.0)]);
        let results = e.stress_test(&snapshot());
        assert_eq!(results.len(), 1);
        // four winners flattened to 0, six losers stay at -1
        assert!((results[0].total_return + 0.6).abs() < 1e-12);
        assert!(results[0].max_drawdown < 0.0);
    }

    #[test]
    fn test_unbounded_scenario_is_skipped_not_reported_unshocked() {
        let e = engine(MonteCarloConfig { trials: 50, ..MonteCarloConfig::default() }).with_scenarios(vec![
            StressScenario::new("runaway", f64::INFINITY, 1.0),
            StressScenario::new("mild", 0.9, 1.1),
        ]);
        let analysis = e.analyze(&snapshot(), &SimulationBudget::unbounded()).unwrap();
        assert_eq!(analysis.stress_tests.len(), 1);
        assert_eq!(analysis.stress_tests[0].scenario, "mild");
        assert_eq!(analysis.skipped_scenarios, vec!["runaway".to_string()]);
        assert!(e.stress_test(&snapshot()).iter().all(|r| r.scenario != "runaway"));
    }
}
