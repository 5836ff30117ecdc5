//! Return metrics engine.
//!
//! Total, average, annualized, cumulative and geometric-mean return,
//! excess return over the risk-free rate, and a rolling-window mean
//! series.

use serde::Serialize;

use super::error::DataGap;
use super::risk::DEFAULT_PERIODS_PER_YEAR;
use super::snapshot::PortfolioSnapshot;
use super::statistics;

/// Default per-period risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.001;
/// Default rolling window, in observations.
pub const DEFAULT_ROLLING_WINDOW: usize = 30;

/// Return statistics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnMetrics {
    /// Total profit over total stake.
    pub total_return: f64,
    /// Arithmetic mean per-bet return.
    pub average_return: f64,
    /// `average_return × periods_per_year`.
    pub annualized_return: f64,
    /// Compounded return `Π(1 + r) − 1`.
    pub cumulative_return: f64,
    /// `(Π(1 + r))^(1/n) − 1`.
    pub geometric_mean_return: f64,
    /// Per-period risk-free rate used for `excess_return`.
    pub risk_free_rate: f64,
    /// Annualized `(average_return − risk_free_rate) × periods_per_year`.
    pub excess_return: f64,
    pub rolling_window: usize,
    /// Mean return of each full rolling window, oldest first.
    pub rolling_returns: Vec<f64>,
    pub data_gaps: Vec<DataGap>,
}

/// Stateless return calculator.
#[derive(Debug, Clone)]
pub struct ReturnMetricsEngine {
    periods_per_year: f64,
    risk_free_rate: f64,
    rolling_window: usize,
}

impl ReturnMetricsEngine {
    pub fn new(periods_per_year: f64, risk_free_rate: f64, rolling_window: usize) -> Self {
        Self {
            periods_per_year,
            risk_free_rate,
            rolling_window: rolling_window.max(1),
        }
    }

    pub fn compute(&self, snapshot: &PortfolioSnapshot) -> ReturnMetrics {
        let returns = &snapshot.returns;
        let n = returns.len();
        let mut data_gaps = Vec::new();

        let log_growth = log_growth(returns);
        let cumulative_return = log_growth.map_or(-1.0, |g| g.exp() - 1.0);
        let geometric_mean_return = match log_growth {
            Some(g) if n > 0 => (g / n as f64).exp() - 1.0,
            _ => -1.0,
        };

        let rolling_returns = rolling_mean(returns, self.rolling_window);
        if n < self.rolling_window {
            data_gaps.push(DataGap::new("rolling_returns", self.rolling_window, n));
        }

        ReturnMetrics {
            total_return: snapshot.stake_weighted_return,
            average_return: snapshot.mean_return,
            annualized_return: snapshot.mean_return * self.periods_per_year,
            cumulative_return,
            geometric_mean_return,
            risk_free_rate: self.risk_free_rate,
            excess_return: (snapshot.mean_return - self.risk_free_rate) * self.periods_per_year,
            rolling_window: self.rolling_window,
            rolling_returns,
            data_gaps,
        }
    }
}

impl Default for ReturnMetricsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PERIODS_PER_YEAR, DEFAULT_RISK_FREE_RATE, DEFAULT_ROLLING_WINDOW)
    }
}

/// `Σ ln(1 + r)`, or `None` once any bet lost everything.
fn log_growth(returns: &[f64]) -> Option<f64> {
    returns.iter().try_fold(0.0, |acc, &r| {
        let gross = 1.0 + r;
        (gross > 0.0).then(|| acc + gross.ln())
    })
}

/// Mean of every full window, oldest first. Empty when `window > len`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    values.windows(window).map(statistics::mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(returns: &[f64]) -> PortfolioSnapshot {
        PortfolioSnapshot::from_returns(&vec![10.0; returns.len()], returns).unwrap()
    }

    #[test]
    fn test_basic_returns() {
        let snap = snapshot(&[0.1, -0.2, 0.05, -0.1, 0.3]);
        let m = ReturnMetricsEngine::default().compute(&snap);
        assert!((m.average_return - 0.03).abs() < 1e-12);
        assert!((m.total_return - 0.03).abs() < 1e-12);
        assert!((m.annualized_return - 0.03 * 252.0).abs() < 1e-9);
        assert!((m.excess_return - 0.029 * 252.0).abs() < 1e-9);
        // 1.1 × 0.8 × 1.05 × 0.9 × 1.3 = 1.081080
        assert!((m.cumulative_return - 0.081_08).abs() < 1e-9);
        assert!((m.geometric_mean_return - (1.081_08_f64.powf(0.2) - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_total_loss_compounds_to_minus_one() {
        let m = ReturnMetricsEngine::default().compute(&snapshot(&[0.5, -1.0, 2.0]));
        assert_eq!(m.cumulative_return, -1.0);
        assert_eq!(m.geometric_mean_return, -1.0);
    }

    #[test]
    fn test_rolling_window() {
        let values: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_eq!(rolling_mean(&values, 2), vec![1.5, 2.5, 3.5, 4.5]);
        assert!(rolling_mean(&values, 6).is_empty());
    }

    #[test]
    fn test_short_history_flags_rolling_gap() {
        let m = ReturnMetricsEngine::default().compute(&snapshot(&[0.1, 0.2]));
        assert!(m.rolling_returns.is_empty());
        assert_eq!(m.data_gaps, vec![DataGap::new("rolling_returns", 30, 2)]);
    }

    #[test]
    fn test_custom_window() {
        let engine = ReturnMetricsEngine::new(252.0, 0.0, 3);
        let m = engine.compute(&snapshot(&[0.3, 0.0, -0.3, 0.6]));
        assert_eq!(m.rolling_returns.len(), 2);
        assert!((m.rolling_returns[1] - 0.1).abs() < 1e-12);
        assert!(m.data_gaps.is_empty());
    }
}
