//! Bet evaluator: expected value, Kelly sizing, efficiency score and tier.
//!
//! Pure function of its input. The only failure mode is candidate
//! validation; warnings are advisory and always accompany a usable
//! evaluation.

use rayon::prelude::*;

use super::bet::{BetCandidate, BetEvaluation, RecommendationTier, Severity, Warning, WarningKind};
use super::error::{AnalyticsError, AnalyticsResult};
use super::kelly::KellyCriterion;

/// Risk-adjusted EV below this is always `Avoid`.
pub const RAEV_HURDLE: f64 = 1.05;
/// Odds band that earns the flat preferred-odds bonus.
const PREFERRED_ODDS: std::ops::RangeInclusive<f64> = 3.0..=25.0;
/// Win probability at which the balance bonus peaks (long-shot sweet spot).
const IDEAL_WIN_PROBABILITY: f64 = 0.15;
/// Odds from which the underdog bonus starts to accrue.
const UNDERDOG_ODDS: f64 = 7.0;

/// Stateless bet evaluator.
#[derive(Debug, Clone, Default)]
pub struct BetEvaluator {
    kelly: KellyCriterion,
}

impl BetEvaluator {
    /// Creates an evaluator with a custom Kelly calculator.
    pub const fn new(kelly: KellyCriterion) -> Self {
        Self { kelly }
    }

    /// Evaluates a single candidate.
    ///
    /// # Errors
    /// `AnalyticsError::InvalidCandidate` when the candidate violates its
    /// invariants (odds <= 1, probability outside [0, 1], ...).
    pub fn evaluate(&self, candidate: &BetCandidate) -> AnalyticsResult<BetEvaluation> {
        candidate
            .validate()
            .map_err(AnalyticsError::invalid_candidate)?;

        let odds = candidate.odds;
        let p = candidate.win_probability;

        let expected_value = odds * p;
        let risk_adjusted_expected_value =
            risk_adjusted_ev(expected_value, p, candidate.confidence);

        let full_kelly_fraction = KellyCriterion::full_fraction(odds, p).max(0.0);
        let kelly_fraction = self.kelly.optimal_fraction(odds, p);

        let efficiency_score = efficiency_score(candidate, risk_adjusted_expected_value);
        let recommendation_tier = tier_for(risk_adjusted_expected_value, efficiency_score);
        let warnings = collect_warnings(candidate, expected_value, efficiency_score);

        Ok(BetEvaluation {
            label: candidate.label.clone(),
            expected_value,
            edge: expected_value - 1.0,
            risk_adjusted_expected_value,
            full_kelly_fraction,
            kelly_fraction,
            efficiency_score,
            recommendation_tier,
            warnings,
        })
    }

    /// Evaluates candidates in parallel, preserving input order.
    ///
    /// Each entry carries its own result; an invalid candidate never
    /// affects its neighbours.
    pub fn evaluate_batch(&self, candidates: &[BetCandidate]) -> Vec<AnalyticsResult<BetEvaluation>> {
        candidates.par_iter().map(|c| self.evaluate(c)).collect()
    }
}

/// `EV × (0.5 + 0.5c) × (1 − 0.1|p − 0.5|) × (1 − 0.2p(1 − p))`.
///
/// Every multiplier stays in (0, 1] for valid inputs.
fn risk_adjusted_ev(expected_value: f64, p: f64, confidence: f64) -> f64 {
    let confidence_adjustment = 0.5 + 0.5 * confidence;
    let uncertainty_penalty = 0.1 * (p - 0.5).abs();
    let volatility_penalty = 0.2 * p * (1.0 - p);
    expected_value * confidence_adjustment * (1.0 - uncertainty_penalty) * (1.0 - volatility_penalty)
}

fn efficiency_score(candidate: &BetCandidate, raev: f64) -> f64 {
    let base = ((raev - 1.0) * 50.0).max(0.0);
    let confidence_bonus = candidate.confidence * 20.0;
    let odds_bonus = if PREFERRED_ODDS.contains(&candidate.odds) { 10.0 } else { 0.0 };
    let balance_bonus = balance_bonus(candidate.win_probability);
    let underdog_bonus = underdog_bonus(candidate.odds, candidate.popularity_rank);

    (base + confidence_bonus + odds_bonus + balance_bonus + underdog_bonus).clamp(0.0, 100.0)
}

/// Up to 10 points, linear falloff from the ideal win probability.
fn balance_bonus(p: f64) -> f64 {
    let distance = (p - IDEAL_WIN_PROBABILITY).abs() / IDEAL_WIN_PROBABILITY;
    10.0 * (1.0 - distance).max(0.0)
}

/// 0–20 points for long odds, topped up by an unpopular market rank.
fn underdog_bonus(odds: f64, popularity_rank: Option<u32>) -> f64 {
    if odds < UNDERDOG_ODDS {
        return 0.0;
    }
    let odds_part = ((odds - UNDERDOG_ODDS) * 1.5).min(15.0);
    let rank_part = popularity_rank
        .filter(|&rank| rank > 3)
        .map_or(0.0, |rank| f64::from(rank - 3).min(5.0));
    (odds_part + rank_part).min(20.0)
}

fn tier_for(raev: f64, score: f64) -> RecommendationTier {
    if raev < RAEV_HURDLE {
        return RecommendationTier::Avoid;
    }
    match score {
        s if s >= 80.0 => RecommendationTier::HighlyRecommended,
        s if s >= 60.0 => RecommendationTier::Recommended,
        s if s >= 40.0 => RecommendationTier::Consider,
        s if s >= 20.0 => RecommendationTier::Weak,
        _ => RecommendationTier::NotRecommended,
    }
}

fn collect_warnings(candidate: &BetCandidate, ev: f64, score: f64) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if ev < 1.0 {
        warnings.push(Warning::new(
            WarningKind::NegativeExpectedValue,
            Severity::High,
            format!("Expected value {ev:.3} is below break-even"),
        ));
    } else if ev < 1.05 {
        warnings.push(Warning::new(
            WarningKind::LowExpectedValue,
            Severity::Medium,
            format!("Expected value {ev:.3} leaves almost no margin"),
        ));
    }

    if candidate.odds < 2.0 {
        warnings.push(Warning::new(
            WarningKind::LowOddsWarning,
            Severity::Medium,
            format!("Odds {:.2} pay less than even money", candidate.odds),
        ));
    }

    if candidate.confidence < 0.3 {
        warnings.push(Warning::new(
            WarningKind::LowConfidence,
            Severity::High,
            format!("Estimate confidence {:.2} is unreliable", candidate.confidence),
        ));
    }

    if score < 20.0 {
        warnings.push(Warning::new(
            WarningKind::LowEfficiency,
            Severity::High,
            format!("Efficiency score {score:.1} is below 20"),
        ));
    }

    warnings
}
