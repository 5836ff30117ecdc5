//! Core betting domain types.
//!
//! Defines the candidate wager supplied by the prediction pipeline and the
//! evaluation the engine derives from it. Both are immutable value objects.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────
// Input
// ────────────────────────────────────────────

/// A candidate wager as supplied by the upstream odds/prediction pipeline.
///
/// The engine never sources these values itself; it only checks the
/// invariants needed for the math to be defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetCandidate {
    /// Optional identifier used in reports (runner name, selection id).
    #[serde(default)]
    pub label: Option<String>,
    /// Decimal payout multiple (stake included), must be > 1.
    pub odds: f64,
    /// Caller-estimated probability of winning, in [0, 1].
    pub win_probability: f64,
    /// Stake in currency units, must be > 0.
    pub stake: f64,
    /// Quality of the probability estimate, in [0, 1].
    pub confidence: f64,
    /// Market popularity rank (1 = favourite), if known.
    #[serde(default)]
    pub popularity_rank: Option<u32>,
}

impl BetCandidate {
    /// Creates an unlabelled candidate without popularity information.
    pub const fn new(odds: f64, win_probability: f64, stake: f64, confidence: f64) -> Self {
        Self {
            label: None,
            odds,
            win_probability,
            stake,
            confidence,
            popularity_rank: None,
        }
    }

    /// Attaches a report label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attaches a popularity rank.
    #[must_use]
    pub const fn with_popularity_rank(mut self, rank: u32) -> Self {
        self.popularity_rank = Some(rank);
        self
    }

    /// Checks the candidate invariants.
    ///
    /// Returns a human-readable reason on the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if !self.odds.is_finite() || self.odds <= 1.0 {
            return Err(format!("odds must be a finite value > 1, got {}", self.odds));
        }
        if !(0.0..=1.0).contains(&self.win_probability) {
            return Err(format!(
                "win_probability must be in [0, 1], got {}",
                self.win_probability
            ));
        }
        if !self.stake.is_finite() || self.stake <= 0.0 {
            return Err(format!("stake must be a finite value > 0, got {}", self.stake));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence must be in [0, 1], got {}", self.confidence));
        }
        if self.popularity_rank == Some(0) {
            return Err("popularity_rank must be a positive integer".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────
// Evaluation output
// ────────────────────────────────────────────

/// Ordered recommendation category.
///
/// `Avoid` is reserved for bets whose risk-adjusted EV fails the hurdle;
/// `NotRecommended` is a positive-EV bet whose efficiency is too low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationTier {
    Avoid,
    NotRecommended,
    Weak,
    Consider,
    Recommended,
    HighlyRecommended,
}

impl std::fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Avoid => "AVOID",
            Self::NotRecommended => "NOT_RECOMMENDED",
            Self::Weak => "WEAK",
            Self::Consider => "CONSIDER",
            Self::Recommended => "RECOMMENDED",
            Self::HighlyRecommended => "HIGHLY_RECOMMENDED",
        };
        write!(f, "{s}")
    }
}

/// Severity of an advisory warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Kind of advisory warning attached to an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    NegativeExpectedValue,
    LowExpectedValue,
    LowOddsWarning,
    LowConfidence,
    LowEfficiency,
}

/// Advisory warning. Never suppresses the evaluation it accompanies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// Per-candidate evaluation. Created once per candidate per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetEvaluation {
    /// Candidate label, copied for reporting.
    pub label: Option<String>,
    /// `odds × win_probability`.
    pub expected_value: f64,
    /// `expected_value − 1`: expected profit per unit staked.
    pub edge: f64,
    /// EV discounted for confidence and outcome variance.
    pub risk_adjusted_expected_value: f64,
    /// Unclamped Kelly fraction, floored at zero.
    pub full_kelly_fraction: f64,
    /// Kelly fraction clamped to [0, 0.25].
    pub kelly_fraction: f64,
    /// Composite efficiency score in [0, 100].
    pub efficiency_score: f64,
    pub recommendation_tier: RecommendationTier,
    pub warnings: Vec<Warning>,
}

impl BetEvaluation {
    /// True when any warning of the given kind was raised.
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Highest warning severity, if any warning was raised.
    pub fn max_severity(&self) -> Option<Severity> {
        self.warnings.iter().map(|w| w.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_candidate() {
        let c = BetCandidate::new(10.0, 0.12, 100.0, 0.7).with_popularity_rank(5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_rejects_odds_at_one() {
        let c = BetCandidate::new(1.0, 0.5, 100.0, 0.5);
        assert!(c.validate().unwrap_err().contains("odds"));
    }

    #[test]
    fn test_rejects_probability_out_of_range() {
        assert!(BetCandidate::new(2.0, 1.2, 10.0, 0.5).validate().is_err());
        assert!(BetCandidate::new(2.0, -0.1, 10.0, 0.5).validate().is_err());
        assert!(BetCandidate::new(2.0, f64::NAN, 10.0, 0.5).validate().is_err());
    }

    #[test]
    fn test_rejects_zero_rank() {
        let c = BetCandidate::new(5.0, 0.2, 10.0, 0.5).with_popularity_rank(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RecommendationTier::Avoid < RecommendationTier::NotRecommended);
        assert!(RecommendationTier::Weak < RecommendationTier::Consider);
        assert!(RecommendationTier::Recommended < RecommendationTier::HighlyRecommended);
        assert_eq!(RecommendationTier::HighlyRecommended.to_string(), "HIGHLY_RECOMMENDED");
    }

    #[test]
    fn test_candidate_deserializes_without_optional_fields() {
        let json = r#"{"odds":4.5,"win_probability":0.25,"stake":20.0,"confidence":0.6}"#;
        let c: BetCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(c.label, None);
        assert_eq!(c.popularity_rank, None);
        assert!((c.odds - 4.5).abs() < f64::EPSILON);
    }
}
