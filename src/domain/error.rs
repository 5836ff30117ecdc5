//! Error taxonomy for the analytics domain.
//!
//! Domain calculators return `Result<T, AnalyticsError>`. Application
//! edges (config loader, adapters, runner) wrap these in `anyhow`.

use serde::Serialize;
use thiserror::Error;

/// Result alias for domain operations.
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

/// Errors raised by the analytics engine.
///
/// None of these are fatal to the host: every public use-case operation
/// turns them into a structured result field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Malformed candidate (odds <= 1, probability outside [0, 1], ...).
    #[error("Invalid candidate: {reason}")]
    InvalidCandidate { reason: String },

    /// Malformed historical outcome (non-positive stake, return < -1, ...).
    #[error("Invalid outcome at index {index}: {reason}")]
    InvalidOutcome { index: usize, reason: String },

    /// No bets to aggregate.
    #[error("Empty portfolio: no bets to aggregate")]
    EmptyPortfolio,

    /// Too few observations for a statistic.
    #[error("Insufficient history for {statistic}: need at least {required}, got {available}")]
    InsufficientHistory {
        statistic: &'static str,
        required: usize,
        available: usize,
    },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl AnalyticsError {
    /// Create an invalid candidate error.
    pub fn invalid_candidate(reason: impl Into<String>) -> Self {
        Self::InvalidCandidate {
            reason: reason.into(),
        }
    }

    /// Create an invalid outcome error.
    pub fn invalid_outcome(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidOutcome {
            index,
            reason: reason.into(),
        }
    }

    /// Create an insufficient history error.
    pub const fn insufficient_history(
        statistic: &'static str,
        required: usize,
        available: usize,
    ) -> Self {
        Self::InsufficientHistory {
            statistic,
            required,
            available,
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// A statistic that could not be computed for lack of observations.
///
/// Accompanies a `None` value in the owning report so consumers can
/// render "insufficient data" instead of a fabricated number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataGap {
    /// Name of the missing statistic.
    pub statistic: &'static str,
    /// Observations required.
    pub required: usize,
    /// Observations available.
    pub available: usize,
}

impl DataGap {
    pub const fn new(statistic: &'static str, required: usize, available: usize) -> Self {
        Self {
            statistic,
            required,
            available,
        }
    }
}

impl From<&DataGap> for AnalyticsError {
    fn from(gap: &DataGap) -> Self {
        Self::insufficient_history(gap.statistic, gap.required, gap.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalyticsError::invalid_candidate("odds must be > 1");
        assert_eq!(err.to_string(), "Invalid candidate: odds must be > 1");

        let err = AnalyticsError::insufficient_history("skewness", 3, 2);
        assert!(err.to_string().contains("need at least 3, got 2"));
    }

    #[test]
    fn test_gap_converts_to_error() {
        let gap = DataGap::new("kurtosis", 4, 1);
        assert_eq!(
            AnalyticsError::from(&gap),
            AnalyticsError::insufficient_history("kurtosis", 4, 1)
        );
    }
}
