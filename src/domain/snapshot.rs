//! Portfolio aggregator.
//!
//! Folds realized (or simulated) bet outcomes into an immutable
//! `PortfolioSnapshot`. Built fresh per analysis call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult, DataGap};
use super::statistics;

/// A settled bet as supplied by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOutcome {
    /// Amount staked.
    pub stake: f64,
    /// `payout / stake − 1`; −1 for a lost bet.
    pub return_rate: f64,
    /// Settlement time, used for ordering.
    pub timestamp: DateTime<Utc>,
}

impl HistoricalOutcome {
    pub const fn new(stake: f64, return_rate: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            stake,
            return_rate,
            timestamp,
        }
    }

    /// Profit in currency units.
    pub fn profit(&self) -> f64 {
        self.stake * self.return_rate
    }
}

/// Aggregate statistics over a sequence of bet returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    /// Number of bets.
    pub observations: usize,
    pub total_stake: f64,
    pub total_profit: f64,
    /// Arithmetic mean of per-bet returns (each bet weighted equally).
    pub mean_return: f64,
    /// `total_profit / total_stake`.
    pub stake_weighted_return: f64,
    /// Population standard deviation of per-bet returns.
    pub return_std_dev: f64,
    pub median_return: f64,
    /// `None` below 3 observations.
    pub skewness: Option<f64>,
    /// Excess kurtosis. `None` below 4 observations.
    pub kurtosis: Option<f64>,
    /// Fraction of bets with a positive return.
    pub win_rate: f64,
    /// Per-bet returns in chronological order.
    pub returns: Vec<f64>,
    /// Per-bet stakes, aligned with `returns`.
    pub stakes: Vec<f64>,
    /// Cumulative profit as a fraction of total stake, after each bet.
    pub cumulative_return_series: Vec<f64>,
    /// Statistics left undefined for lack of data.
    pub data_gaps: Vec<DataGap>,
}

impl PortfolioSnapshot {
    /// Builds a snapshot from historical outcomes, sorted by timestamp.
    ///
    /// # Errors
    /// - `EmptyPortfolio` for zero outcomes
    /// - `InvalidOutcome` for a non-positive stake or a return below −1
    pub fn from_outcomes(outcomes: &[HistoricalOutcome]) -> AnalyticsResult<Self> {
        let mut ordered: Vec<&HistoricalOutcome> = outcomes.iter().collect();
        ordered.sort_by_key(|o| o.timestamp);

        let stakes: Vec<f64> = ordered.iter().map(|o| o.stake).collect();
        let returns: Vec<f64> = ordered.iter().map(|o| o.return_rate).collect();
        Self::from_returns(&stakes, &returns)
    }

    /// Builds a snapshot from aligned stake and return slices, in order.
    ///
    /// # Errors
    /// - `EmptyPortfolio` for zero bets
    /// - `InvalidOutcome` for mismatched lengths, a non-positive stake or a
    ///   return below −1
    pub fn from_returns(stakes: &[f64], returns: &[f64]) -> AnalyticsResult<Self> {
        if returns.is_empty() {
            return Err(AnalyticsError::EmptyPortfolio);
        }
        if stakes.len() != returns.len() {
            return Err(AnalyticsError::invalid_outcome(
                stakes.len().min(returns.len()),
                format!(
                    "{} stakes for {} returns",
                    stakes.len(),
                    returns.len()
                ),
            ));
        }
        for (i, (&stake, &r)) in stakes.iter().zip(returns).enumerate() {
            if !stake.is_finite() || stake <= 0.0 {
                return Err(AnalyticsError::invalid_outcome(i, format!("stake {stake} must be > 0")));
            }
            if !r.is_finite() || r < -1.0 {
                return Err(AnalyticsError::invalid_outcome(i, format!("return {r} must be >= -1")));
            }
        }

        let n = returns.len();
        let total_stake: f64 = stakes.iter().sum();

        let mut running = 0.0;
        let cumulative_return_series: Vec<f64> = stakes
            .iter()
            .zip(returns)
            .map(|(s, r)| {
                running += s * r;
                running / total_stake
            })
            .collect();
        let total_profit = running;

        let skewness = statistics::skewness(returns);
        let kurtosis = statistics::excess_kurtosis(returns);

        let mut data_gaps = Vec::new();
        if n < 3 {
            data_gaps.push(DataGap::new("skewness", 3, n));
        }
        if n < 4 {
            data_gaps.push(DataGap::new("kurtosis", 4, n));
        }

        Ok(Self {
            observations: n,
            total_stake,
            total_profit,
            mean_return: statistics::mean(returns),
            stake_weighted_return: total_profit / total_stake,
            return_std_dev: statistics::population_std_dev(returns),
            median_return: statistics::median(returns),
            skewness,
            kurtosis,
            win_rate: returns.iter().filter(|&&r| r > 0.0).count() as f64 / n as f64,
            returns: returns.to_vec(),
            stakes: stakes.to_vec(),
            cumulative_return_series,
            data_gaps,
        })
    }

    /// Wealth index `1 + cumulative return`, starting from 1.0 before the
    /// first bet.
    pub fn wealth_index(&self) -> Vec<f64> {
        std::iter::once(1.0)
            .chain(self.cumulative_return_series.iter().map(|c| 1.0 + c))
            .collect()
    }

    /// Returns a copy with every return transformed, clamped to ≥ −1.
    ///
    /// Stakes and ordering are preserved; statistics are recomputed.
    ///
    /// # Errors
    /// `InvalidOutcome` when the transform yields a non-finite return.
    pub fn map_returns(&self, f: impl Fn(f64) -> f64) -> AnalyticsResult<Self> {
        let shocked: Vec<f64> = self.returns.iter().map(|&r| f(r).max(-1.0)).collect();
        Self::from_returns(&self.stakes, &shocked)
    }
}
