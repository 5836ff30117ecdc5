//! Domain layer - Core analytics logic and value objects.
//!
//! Pure, synchronous calculators for the betting portfolio engine. No I/O
//! and no shared mutable state (hexagonal architecture inner ring). Every
//! output type is serializable and testable in isolation.
//!
//! Dependency order is strictly downward: evaluator → snapshot →
//! risk / returns → performance → optimizer / scenario → recommendation.

pub mod bet;
pub mod error;
pub mod evaluator;
pub mod kelly;
pub mod optimizer;
pub mod performance;
pub mod recommendation;
pub mod returns;
pub mod risk;
pub mod scenario;
pub mod snapshot;
pub mod statistics;

// Re-export core types for convenience
pub use bet::{BetCandidate, BetEvaluation, RecommendationTier, Severity, Warning, WarningKind};
pub use error::{AnalyticsError, AnalyticsResult, DataGap};
pub use evaluator::BetEvaluator;
pub use kelly::KellyCriterion;
pub use optimizer::{OddsBand, OptimizationReport, OptimizerLimits, PortfolioOptimizer};
pub use performance::{PerformanceEngine, RiskAdjustedMetrics};
pub use recommendation::{
    Priority, Recommendation, RecommendationContext, RecommendationKind, RecommendationSynthesizer,
};
pub use returns::{ReturnMetrics, ReturnMetricsEngine};
pub use risk::{RiskLevel, RiskMetricsEngine, RiskProfile};
pub use scenario::{
    MonteCarloConfig, MonteCarloResult, SamplingMethod, ScenarioAnalysis, ScenarioEngine,
    SimulationBudget, StressScenario,
};
pub use snapshot::{HistoricalOutcome, PortfolioSnapshot};
pub use statistics::{HypothesisTest, SignificanceReport};
