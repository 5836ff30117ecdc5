//! Recommendation synthesizer.
//!
//! Turns the outputs of every other engine into ranked, human-readable
//! action items. Highest priority first; insertion order is kept within a
//! priority.

use serde::Serialize;

use super::bet::{BetEvaluation, RecommendationTier};
use super::optimizer::OptimizationReport;
use super::performance::RiskAdjustedMetrics;
use super::risk::{RiskLevel, RiskProfile};
use super::scenario::ScenarioAnalysis;
use super::statistics::SignificanceReport;

/// Drawdown beyond which a HIGH recommendation is raised.
const SEVERE_DRAWDOWN: f64 = -0.3;
/// Drawdown beyond which a MEDIUM recommendation is raised.
const NOTABLE_DRAWDOWN: f64 = -0.15;
const POOR_OVERALL_SCORE: f64 = 40.0;
/// Simulated probability of loss that triggers a tail-risk warning.
const LOSS_PROBABILITY_LIMIT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    NegativeExpectedValue,
    StrongOpportunity,
    Concentration,
    PositionLimit,
    Diversification,
    Rebalance,
    HighRisk,
    Drawdown,
    PoorRiskAdjustedReturn,
    TailRisk,
    StressVulnerability,
    EdgeNotSignificant,
    PerformanceDeterioration,
    InsufficientData,
}

/// A ranked action item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    /// What was observed.
    pub message: String,
    /// What to do about it.
    pub action: String,
}

impl Recommendation {
    pub fn new(
        kind: RecommendationKind,
        priority: Priority,
        message: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            priority,
            message: message.into(),
            action: action.into(),
        }
    }
}

/// Borrowed view of every engine output. Missing sections are `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationContext<'a> {
    pub evaluations: &'a [BetEvaluation],
    pub risk: Option<&'a RiskProfile>,
    pub performance: Option<&'a RiskAdjustedMetrics>,
    pub optimization: Option<&'a OptimizationReport>,
    pub scenarios: Option<&'a ScenarioAnalysis>,
    pub significance: Option<&'a SignificanceReport>,
}

#[derive(Debug, Clone)]
pub struct RecommendationSynthesizer {
    significance_level: f64,
}

impl Default for RecommendationSynthesizer {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl RecommendationSynthesizer {
    pub const fn new(significance_level: f64) -> Self {
        Self { significance_level }
    }

    pub fn synthesize(&self, ctx: &RecommendationContext<'_>) -> Vec<Recommendation> {
        let mut out = Vec::new();
        bet_recommendations(ctx.evaluations, &mut out);
        if let Some(report) = ctx.optimization {
            optimizer_recommendations(report, &mut out);
        }
        if let Some(risk) = ctx.risk {
            risk_recommendations(risk, &mut out);
        }
        if let Some(performance) = ctx.performance {
            performance_recommendations(performance, &mut out);
        }
        if let Some(scenarios) = ctx.scenarios {
            scenario_recommendations(scenarios, &mut out);
        }
        match ctx.significance {
            Some(report) => self.significance_recommendations(report, &mut out),
            None if !ctx.evaluations.is_empty() => out.push(Recommendation::new(
                RecommendationKind::InsufficientData,
                Priority::Low,
                "No settled history; portfolio statistics were not computed",
                "Record bet outcomes to enable risk and performance analysis",
            )),
            None => {}
        }

        // stable: keeps insertion order within a priority
        out.sort_by(|a, b| b.priority.cmp(&a.priority));
        out
    }

    fn significance_recommendations(&self, report: &SignificanceReport, out: &mut Vec<Recommendation>) {
        let alpha = self.significance_level;
        if let Some(test) = &report.edge_test {
            if !test.is_significant(alpha) {
                out.push(Recommendation::new(
                    RecommendationKind::EdgeNotSignificant,
                    Priority::Low,
                    format!(
                        "Mean return is not significantly different from zero (p = {:.3})",
                        test.p_value
                    ),
                    "Treat the historical edge as unproven; keep stakes conservative",
                ));
            }
        }
        if report.has_deteriorated(alpha) {
            out.push(Recommendation::new(
                RecommendationKind::PerformanceDeterioration,
                Priority::Medium,
                format!(
                    "Recent returns ({:.3}) are significantly worse than earlier returns ({:.3})",
                    report.later_mean.unwrap_or_default(),
                    report.earlier_mean.unwrap_or_default()
                ),
                "Review the probability model for drift before adding exposure",
            ));
        }
        if !report.data_gaps.is_empty() {
            let names: Vec<&str> = report.data_gaps.iter().map(|g| g.statistic).collect();
            out.push(Recommendation::new(
                RecommendationKind::InsufficientData,
                Priority::Low,
                format!("Not enough history for: {}", names.join(", ")),
                "Collect more settled bets before relying on significance tests",
            ));
        }
    }
}

fn bet_recommendations(evaluations: &[BetEvaluation], out: &mut Vec<Recommendation>) {
    let negative: Vec<String> = evaluations
        .iter()
        .enumerate()
        .filter(|(_, e)| e.expected_value < 1.0)
        .map(|(i, e)| display_name(e, i))
        .collect();
    if !negative.is_empty() {
        out.push(Recommendation::new(
            RecommendationKind::NegativeExpectedValue,
            Priority::High,
            format!(
                "{} bet(s) have negative expected value: {}",
                negative.len(),
                negative.join(", ")
            ),
            "Remove these bets from the portfolio",
        ));
    }

    let strong: Vec<String> = evaluations
        .iter()
        .enumerate()
        .filter(|(_, e)| e.recommendation_tier == RecommendationTier::HighlyRecommended)
        .map(|(i, e)| display_name(e, i))
        .collect();
    if !strong.is_empty() {
        out.push(Recommendation::new(
            RecommendationKind::StrongOpportunity,
            Priority::Low,
            format!("Highly recommended: {}", strong.join(", ")),
            "Size these positions toward their Kelly fraction",
        ));
    }
}

fn optimizer_recommendations(report: &OptimizationReport, out: &mut Vec<Recommendation>) {
    for flag in &report.concentration_flags {
        let name = flag
            .label
            .clone()
            .unwrap_or_else(|| format!("#{}", flag.index));
        out.push(Recommendation::new(
            RecommendationKind::Concentration,
            Priority::High,
            format!("{name} holds {:.1}% of total stake", flag.stake_ratio * 100.0),
            format!("Reduce the stake by {:.2}", flag.excess_stake),
        ));
    }
    if report.position_limit_exceeded {
        out.push(Recommendation::new(
            RecommendationKind::PositionLimit,
            Priority::Medium,
            format!("{} open positions exceed the configured limit", report.position_count),
            "Drop the lowest-efficiency positions",
        ));
    }
    if report.below_min_diversification && report.position_count > 0 {
        out.push(Recommendation::new(
            RecommendationKind::Diversification,
            Priority::Medium,
            format!(
                "Stake spans only {} odds band(s) (diversification score {:.0})",
                report.occupied_bands, report.diversification_score
            ),
            "Add positions in other odds ranges",
        ));
    }
    for s in &report.rebalance_suggestions {
        out.push(Recommendation::new(
            RecommendationKind::Rebalance,
            Priority::Low,
            format!("Odds band weights drifted from target ({:?} → {:?})", s.from_band, s.to_band),
            format!("Move {:.2} of stake from {:?} to {:?}", s.amount, s.from_band, s.to_band),
        ));
    }
}

fn risk_recommendations(risk: &RiskProfile, out: &mut Vec<Recommendation>) {
    if risk.risk_level >= RiskLevel::High {
        out.push(Recommendation::new(
            RecommendationKind::HighRisk,
            Priority::High,
            format!("Portfolio risk level is {} (score {:.2})", risk.risk_level, risk.risk_score),
            "Cut overall stake size until volatility falls",
        ));
    }
    if risk.max_drawdown <= SEVERE_DRAWDOWN {
        out.push(Recommendation::new(
            RecommendationKind::Drawdown,
            Priority::High,
            format!("Maximum drawdown reached {:.1}%", risk.max_drawdown * 100.0),
            "Pause new bets and reassess bankroll management",
        ));
    } else if risk.max_drawdown <= NOTABLE_DRAWDOWN {
        out.push(Recommendation::new(
            RecommendationKind::Drawdown,
            Priority::Medium,
            format!("Maximum drawdown reached {:.1}%", risk.max_drawdown * 100.0),
            "Use fractional Kelly sizing to limit drawdowns",
        ));
    }
}

fn performance_recommendations(performance: &RiskAdjustedMetrics, out: &mut Vec<Recommendation>) {
    if performance.sharpe_ratio < 0.0 || performance.overall_score < POOR_OVERALL_SCORE {
        out.push(Recommendation::new(
            RecommendationKind::PoorRiskAdjustedReturn,
            Priority::Medium,
            format!(
                "Risk-adjusted performance is weak (Sharpe {:.2}, score {:.0})",
                performance.sharpe_ratio, performance.overall_score
            ),
            "Favour bets with higher efficiency scores",
        ));
    }
}

fn scenario_recommendations(scenarios: &ScenarioAnalysis, out: &mut Vec<Recommendation>) {
    if let Some(summary) = &scenarios.monte_carlo.summary {
        if summary.probability_of_loss > LOSS_PROBABILITY_LIMIT {
            out.push(Recommendation::new(
                RecommendationKind::TailRisk,
                Priority::High,
                format!(
                    "Simulation shows a {:.0}% chance of ending below the starting bankroll",
                    summary.probability_of_loss * 100.0
                ),
                "Lower stake fractions or drop negative-edge bets",
            ));
        }
    }
    let fragile: Vec<&str> = scenarios
        .stress_tests
        .iter()
        .filter(|s| s.risk_level == RiskLevel::VeryHigh)
        .map(|s| s.scenario.as_str())
        .collect();
    if !fragile.is_empty() {
        out.push(Recommendation::new(
            RecommendationKind::StressVulnerability,
            Priority::Medium,
            format!("Risk becomes very high under: {}", fragile.join(", ")),
            "Hedge or reduce exposure to adverse payout shocks",
        ));
    }
}

fn display_name(evaluation: &BetEvaluation, index: usize) -> String {
    evaluation
        .label
        .clone()
        .unwrap_or_else(|| format!("#{index}"))
}
