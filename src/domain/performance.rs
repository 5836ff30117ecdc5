//! Risk-adjusted performance engine.
//!
//! Combines return and risk metrics into Sharpe, Sortino, Treynor,
//! Information, Calmar and Omega ratios plus a composite score.
//!
//! Every ratio guards its denominator: a zero (or non-finite) denominator
//! yields 0 rather than an infinity or NaN. Callers must read a 0 ratio as
//! "undefined, treated as neutral". Ratios that need a benchmark are
//! `None` when none was supplied.

use serde::Serialize;

use super::returns::ReturnMetrics;
use super::risk::RiskProfile;
use super::statistics;

const SHARPE_WEIGHT: f64 = 0.35;
const SORTINO_WEIGHT: f64 = 0.25;
const CALMAR_WEIGHT: f64 = 0.20;
const OMEGA_WEIGHT: f64 = 0.20;

/// Risk-adjusted ratios for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAdjustedMetrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// `None` without a benchmark (beta unavailable).
    pub treynor_ratio: Option<f64>,
    /// `None` without a benchmark.
    pub information_ratio: Option<f64>,
    pub calmar_ratio: f64,
    pub omega_ratio: f64,
    /// Weighted composite in [0, 100]; 50 is neutral.
    pub overall_score: f64,
}

/// Stateless ratio calculator.
#[derive(Debug, Clone)]
pub struct PerformanceEngine {
    periods_per_year: f64,
}

impl PerformanceEngine {
    pub const fn new(periods_per_year: f64) -> Self {
        Self { periods_per_year }
    }

    /// Computes every ratio.
    ///
    /// `returns` are the per-period returns behind both metric sets;
    /// `benchmark` must be aligned with them to yield an information ratio.
    pub fn compute(
        &self,
        returns: &[f64],
        return_metrics: &ReturnMetrics,
        risk: &RiskProfile,
        benchmark: Option<&[f64]>,
    ) -> RiskAdjustedMetrics {
        let excess = return_metrics.excess_return;
        let sqrt_periods = self.periods_per_year.sqrt();

        let sharpe_ratio = safe_ratio(excess, risk.volatility);
        let sortino_ratio = safe_ratio(excess, risk.downside_deviation * sqrt_periods);
        let treynor_ratio = risk.beta.map(|beta| safe_ratio(excess, beta));
        let information_ratio = benchmark
            .filter(|b| b.len() == returns.len() && !returns.is_empty())
            .map(|b| self.information_ratio(returns, b));
        let calmar_ratio = safe_ratio(return_metrics.annualized_return, risk.max_drawdown.abs());
        let (gains, losses) = omega_components(returns, return_metrics.risk_free_rate);
        let omega_ratio = safe_ratio(gains, losses);
        // nothing below the threshold leaves Omega undefined, scored neutral
        let omega_score = if losses > f64::EPSILON { squash(omega_ratio - 1.0) } else { 0.0 };

        let weighted = SHARPE_WEIGHT * squash(sharpe_ratio)
            + SORTINO_WEIGHT * squash(sortino_ratio)
            + CALMAR_WEIGHT * squash(calmar_ratio)
            + OMEGA_WEIGHT * omega_score;

        RiskAdjustedMetrics {
            sharpe_ratio,
            sortino_ratio,
            treynor_ratio,
            information_ratio,
            calmar_ratio,
            omega_ratio,
            overall_score: (50.0 + 50.0 * weighted).clamp(0.0, 100.0),
        }
    }

    /// Annualized active return over annualized tracking error.
    fn information_ratio(&self, returns: &[f64], benchmark: &[f64]) -> f64 {
        let active: Vec<f64> = returns.iter().zip(benchmark).map(|(r, m)| r - m).collect();
        let active_return = statistics::mean(&active) * self.periods_per_year;
        let tracking_error = statistics::population_std_dev(&active) * self.periods_per_year.sqrt();
        safe_ratio(active_return, tracking_error)
    }
}

/// `numerator / denominator`, or 0 when the denominator is zero or not
/// finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if !denominator.is_finite() || denominator.abs() <= f64::EPSILON {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { 0.0 }
}

/// Probability-weighted gains over losses relative to `threshold`.
///
/// 0 when nothing fell below the threshold (undefined ratio).
pub fn omega_ratio(returns: &[f64], threshold: f64) -> f64 {
    let (gains, losses) = omega_components(returns, threshold);
    safe_ratio(gains, losses)
}

/// Summed excess above and shortfall below `threshold`, both ≥ 0.
fn omega_components(returns: &[f64], threshold: f64) -> (f64, f64) {
    returns.iter().fold((0.0, 0.0), |(g, l), &r| {
        let excess = r - threshold;
        if excess > 0.0 {
            (g + excess, l)
        } else {
            (g, l - excess)
        }
    })
}

/// Maps any real onto (−1, 1), preserving sign and order.
fn squash(x: f64) -> f64 {
    x / (1.0 + x.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::returns::ReturnMetricsEngine;
    use crate::domain::risk::RiskMetricsEngine;
    use crate::domain::snapshot::PortfolioSnapshot;

    fn metrics(returns: &[f64], benchmark: Option<&[f64]>) -> RiskAdjustedMetrics {
        let snap = PortfolioSnapshot::from_returns(&vec![1.0; returns.len()], returns).unwrap();
        let risk = RiskMetricsEngine::default().compute(&snap, benchmark);
        let ret = ReturnMetricsEngine::default().compute(&snap);
        PerformanceEngine::new(252.0).compute(&snap.returns, &ret, &risk, benchmark)
    }

    #[test]
    fn test_zero_volatility_gives_zero_sharpe() {
        let m = metrics(&[0.25; 6], None);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
        assert!(m.overall_score.is_finite());
    }

    #[test]
    fn test_sharpe_matches_definition() {
        let returns = [0.1, -0.2, 0.05, -0.1, 0.3];
        let m = metrics(&returns, None);
        let expected = (0.029 * 252.0) / (0.0296_f64.sqrt() * 252.0_f64.sqrt());
        assert!((m.sharpe_ratio - expected).abs() < 1e-9);
        assert_eq!(m.treynor_ratio, None);
        assert_eq!(m.information_ratio, None);
    }

    #[test]
    fn test_inexact_constant_returns_give_neutral_ratios() {
        // ten copies of 0.3 do not average back to exactly 0.3
        let m = metrics(&[0.3; 10], None);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
        assert_eq!(m.overall_score, 50.0);
    }

    #[test]
    fn test_sortino_and_calmar_match_definitions() {
        let returns = [0.1, -0.2, 0.05, -0.1, 0.3];
        let m = metrics(&returns, None);
        let excess = 0.029 * 252.0;

        // shortfalls below the 0.03 mean: 0.23 and 0.13
        let downside = ((0.23_f64.powi(2) + 0.13_f64.powi(2)) / 2.0).sqrt();
        let sortino = excess / (downside * 252.0_f64.sqrt());
        assert!((m.sortino_ratio - sortino).abs() < 1e-9);

        // wealth peaks at 1.02 and bottoms at 0.97
        let calmar = (0.03 * 252.0) / (0.05 / 1.02);
        assert!((m.calmar_ratio - calmar).abs() < 1e-6);
    }

    #[test]
    fn test_treynor_and_information_ratio_match_definitions() {
        let returns = [0.1, -0.2, 0.05, -0.1, 0.3];
        let bench: Vec<f64> = returns.iter().map(|r| 2.0 * r).collect();
        let m = metrics(&returns, Some(&bench));

        // beta = cov(r, 2r) / var(2r) = 0.5
        let treynor = (0.029 * 252.0) / 0.5;
        assert!((m.treynor_ratio.unwrap() - treynor).abs() < 1e-9);

        // active return is −r: mean −0.03, std √0.0296
        let information = (-0.03 * 252.0) / (0.0296_f64.sqrt() * 252.0_f64.sqrt());
        assert!((m.information_ratio.unwrap() - information).abs() < 1e-9);
    }

    #[test]
    fn test_all_losses_score_below_losses_with_a_small_gain() {
        let losing = metrics(&[-0.5, -0.5, -0.5, -0.4], None);
        let nearly = metrics(&[-0.5, -0.5, -0.5, -0.4, 0.0011], None);
        assert_eq!(losing.omega_ratio, 0.0);
        assert!(nearly.omega_ratio > 0.0);
        assert!(losing.overall_score < nearly.overall_score);
    }

    #[test]
    fn test_benchmark_enables_treynor_and_information_ratio() {
        let bench = [0.01, -0.02, 0.03, -0.01, 0.02];
        let returns = [0.05, -0.03, 0.08, 0.0, 0.04];
        let m = metrics(&returns, Some(&bench));
        assert!(m.treynor_ratio.is_some());
        assert!(m.information_ratio.unwrap() > 0.0);
    }

    #[test]
    fn test_omega_ratio() {
        // gains 0.3 + 0.1, losses 0.2 against a zero threshold
        assert!((omega_ratio(&[0.3, -0.2, 0.1], 0.0) - 2.0).abs() < 1e-12);
        assert_eq!(omega_ratio(&[0.3, 0.1], 0.0), 0.0);
    }

    #[test]
    fn test_safe_ratio_guards() {
        assert_eq!(safe_ratio(1.0, 0.0), 0.0);
        assert_eq!(safe_ratio(1.0, f64::NAN), 0.0);
        assert!((safe_ratio(1.0, 4.0) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_losing_portfolio_scores_below_neutral() {
        let m = metrics(&[-0.5, -1.0, 0.2, -1.0, -0.3, 0.1], None);
        assert!(m.sharpe_ratio < 0.0);
        assert!(m.overall_score < 50.0);
    }
}
