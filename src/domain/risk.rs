//! Risk metrics engine.
//!
//! Derives a `RiskProfile` from a `PortfolioSnapshot`: annualized
//! volatility, drawdown, historical-simulation VaR/CVaR, downside
//! deviation, benchmark beta and a five-bucket risk level. Deterministic,
//! no mutation.

use serde::Serialize;

use super::error::DataGap;
use super::snapshot::PortfolioSnapshot;
use super::statistics;

/// Default annualization factor (one observation per trading-style period).
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Ordinal risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Maps a composite risk score onto the fixed 0.1/0.25/0.5/0.75 buckets.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 0.1 => Self::VeryLow,
            s if s < 0.25 => Self::Low,
            s if s < 0.5 => Self::Medium,
            s if s < 0.75 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        };
        write!(f, "{s}")
    }
}

/// Risk statistics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskProfile {
    /// Annualized standard deviation of returns.
    pub volatility: f64,
    /// Largest peak-to-trough decline of the wealth index, as a negative
    /// fraction (0 when the portfolio never declined).
    pub max_drawdown: f64,
    /// Longest stretch of bets spent below a previous peak.
    pub max_drawdown_duration: usize,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    /// Regression beta against the supplied benchmark; `None` without one.
    pub beta: Option<f64>,
    /// Std dev of returns below the mean (per period).
    pub downside_deviation: f64,
    /// Std dev of returns below zero (per period).
    pub semi_volatility: f64,
    /// Correlation between consecutive returns.
    pub lag1_autocorrelation: Option<f64>,
    /// Pearson correlation with the benchmark.
    pub benchmark_correlation: Option<f64>,
    /// `0.4|vol| + 0.4|mdd| + 0.2|VaR95|`.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub data_gaps: Vec<DataGap>,
}

/// Stateless risk calculator.
#[derive(Debug, Clone)]
pub struct RiskMetricsEngine {
    periods_per_year: f64,
}

impl RiskMetricsEngine {
    pub const fn new(periods_per_year: f64) -> Self {
        Self { periods_per_year }
    }

    /// Computes the full risk profile.
    ///
    /// `benchmark` must be aligned with `snapshot.returns`; a missing or
    /// misaligned series leaves beta and benchmark correlation undefined.
    pub fn compute(&self, snapshot: &PortfolioSnapshot, benchmark: Option<&[f64]>) -> RiskProfile {
        let returns = &snapshot.returns;
        let n = returns.len();
        let mut data_gaps = Vec::new();

        let volatility = snapshot.return_std_dev * self.periods_per_year.sqrt();
        let (max_drawdown, max_drawdown_duration) = max_drawdown(&snapshot.wealth_index());

        let ordered = statistics::sorted(returns);
        let var_95 = value_at_risk_sorted(&ordered, 0.95);
        let var_99 = value_at_risk_sorted(&ordered, 0.99);
        let cvar_95 = conditional_var_sorted(&ordered, var_95);
        let cvar_99 = conditional_var_sorted(&ordered, var_99);

        let aligned = benchmark.filter(|b| b.len() == n);
        let beta = aligned.and_then(|b| beta(returns, b));
        let benchmark_correlation = aligned.and_then(|b| statistics::pearson_correlation(returns, b));
        match (aligned, beta) {
            (_, Some(_)) => {}
            // aligned but flat: two distinct benchmark values needed, one seen
            (Some(_), None) => data_gaps.push(DataGap::new("benchmark_variance", 2, 1)),
            (None, None) => data_gaps.push(DataGap::new("beta", n, benchmark.map_or(0, <[f64]>::len))),
        }

        let lag1_autocorrelation = statistics::lag1_autocorrelation(returns);
        if n < 3 {
            data_gaps.push(DataGap::new("lag1_autocorrelation", 3, n));
        }

        let risk_score = 0.4 * volatility.abs() + 0.4 * max_drawdown.abs() + 0.2 * var_95.abs();

        RiskProfile {
            volatility,
            max_drawdown,
            max_drawdown_duration,
            var_95,
            var_99,
            cvar_95,
            cvar_99,
            beta,
            downside_deviation: deviation_below(returns, snapshot.mean_return),
            semi_volatility: deviation_below(returns, 0.0),
            lag1_autocorrelation,
            benchmark_correlation,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            data_gaps,
        }
    }

    pub const fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }
}

impl Default for RiskMetricsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PERIODS_PER_YEAR)
    }
}

/// Historical-simulation VaR: the `(1 − confidence)` quantile of returns.
///
/// Reported as a return (negative for a loss), not as a positive loss.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    value_at_risk_sorted(&statistics::sorted(returns), confidence)
}

fn value_at_risk_sorted(ordered: &[f64], confidence: f64) -> f64 {
    statistics::quantile_sorted(ordered, 1.0 - confidence)
}

/// Expected return conditional on breaching the VaR threshold.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    let ordered = statistics::sorted(returns);
    let var = value_at_risk_sorted(&ordered, confidence);
    conditional_var_sorted(&ordered, var)
}

fn conditional_var_sorted(ordered: &[f64], var: f64) -> f64 {
    let tail: Vec<f64> = ordered.iter().copied().take_while(|&r| r <= var).collect();
    if tail.is_empty() {
        var
    } else {
        statistics::mean(&tail)
    }
}

/// Max drawdown (≤ 0) and its duration over a wealth index.
pub fn max_drawdown(wealth: &[f64]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    let mut duration = 0usize;
    let mut longest = 0usize;

    for &value in wealth {
        if value >= peak {
            peak = value;
            duration = 0;
            continue;
        }
        duration += 1;
        longest = longest.max(duration);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }

    (if worst > 0.0 { -worst } else { 0.0 }, longest)
}

/// `cov(r, m) / var(m)`; `None` for a constant or misaligned benchmark.
pub fn beta(returns: &[f64], benchmark: &[f64]) -> Option<f64> {
    let var_m = statistics::population_variance(benchmark);
    if var_m <= f64::EPSILON {
        return None;
    }
    statistics::covariance(returns, benchmark).map(|cov| cov / var_m)
}

/// Root-mean-square deviation from `threshold` over the returns below it.
fn deviation_below(returns: &[f64], threshold: f64) -> f64 {
    let below: Vec<f64> = returns
        .iter()
        .filter(|&&r| r < threshold)
        .map(|&r| (r - threshold).powi(2))
        .collect();
    if below.is_empty() {
        return 0.0;
    }
    statistics::mean(&below).sqrt()
}
