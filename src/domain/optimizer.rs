//! Portfolio optimizer.
//!
//! Measures diversification across decimal-odds bands, flags concentrated
//! positions, suggests rebalancing transfers between bands and traces an
//! approximate efficient frontier by grid search over blends of three
//! anchor portfolios. This is a coarse search, not a quadratic optimizer.

use serde::Serialize;

use super::bet::{BetCandidate, BetEvaluation};

/// Number of odds bands; also the cap on the band component of the
/// diversification score.
pub const BAND_COUNT: usize = 6;
/// Grid resolution for the frontier search (steps per unit weight).
const FRONTIER_STEPS: usize = 10;

/// Decimal-odds band used to measure diversification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OddsBand {
    /// Below 2.0
    Favourite,
    /// 2.0 to 3.5
    Short,
    /// 3.5 to 6.0
    Mid,
    /// 6.0 to 10.0
    Value,
    /// 10.0 to 20.0
    Long,
    /// 20.0 and above
    Outsider,
}

impl OddsBand {
    pub const ALL: [Self; BAND_COUNT] = [
        Self::Favourite,
        Self::Short,
        Self::Mid,
        Self::Value,
        Self::Long,
        Self::Outsider,
    ];

    pub fn from_odds(odds: f64) -> Self {
        match odds {
            o if o < 2.0 => Self::Favourite,
            o if o < 3.5 => Self::Short,
            o if o < 6.0 => Self::Mid,
            o if o < 10.0 => Self::Value,
            o if o < 20.0 => Self::Long,
            _ => Self::Outsider,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Limits enforced by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerLimits {
    /// Largest allowed share of total stake in a single position.
    pub max_single_bet_ratio: f64,
    pub max_positions: usize,
    /// Minimum number of distinct odds bands.
    pub min_diversification: usize,
    /// Band weight drift tolerated before a rebalance is suggested.
    pub rebalance_threshold: f64,
}

impl Default for OptimizerLimits {
    fn default() -> Self {
        Self {
            max_single_bet_ratio: 0.2,
            max_positions: 10,
            min_diversification: 3,
            rebalance_threshold: 0.1,
        }
    }
}

/// Stake held in one odds band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandAllocation {
    pub band: OddsBand,
    pub positions: usize,
    pub stake: f64,
    /// Share of total stake.
    pub weight: f64,
    /// Stake-weighted expected return (edge) of the band.
    pub expected_return: f64,
}

/// A position whose stake share exceeds `max_single_bet_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationFlag {
    /// Index into the analysed positions.
    pub index: usize,
    pub label: Option<String>,
    pub stake_ratio: f64,
    /// Stake to remove to get back under the limit.
    pub excess_stake: f64,
}

/// Suggested stake transfer between bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalanceSuggestion {
    pub from_band: OddsBand,
    pub to_band: OddsBand,
    /// Currency amount, rounded to cents.
    pub amount: f64,
}

/// One portfolio on the risk/return plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierPoint {
    /// Expected return per unit staked.
    pub expected_return: f64,
    /// Standard deviation of return per unit staked (bets independent).
    pub risk: f64,
    /// Position weights, aligned with the analysed positions.
    pub weights: Vec<f64>,
}

/// Optimizer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub position_count: usize,
    pub total_stake: f64,
    /// 0–100: band coverage (60 points) plus stake evenness (40 points).
    pub diversification_score: f64,
    pub occupied_bands: usize,
    pub band_allocations: Vec<BandAllocation>,
    pub concentration_flags: Vec<ConcentrationFlag>,
    pub position_limit_exceeded: bool,
    pub below_min_diversification: bool,
    pub rebalance_suggestions: Vec<RebalanceSuggestion>,
    /// The portfolio as currently staked.
    pub current_point: Option<FrontierPoint>,
    /// Pareto-efficient points, ordered by increasing risk.
    pub efficient_frontier: Vec<FrontierPoint>,
}

/// Stateless optimizer.
#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer {
    limits: OptimizerLimits,
}

impl PortfolioOptimizer {
    pub const fn new(limits: OptimizerLimits) -> Self {
        Self { limits }
    }

    pub const fn limits(&self) -> &OptimizerLimits {
        &self.limits
    }

    /// Analyses the positions. Each candidate is paired with its evaluation.
    pub fn optimize(&self, positions: &[(&BetCandidate, &BetEvaluation)]) -> OptimizationReport {
        let total_stake: f64 = positions.iter().map(|(c, _)| c.stake).sum();
        let band_allocations = band_allocations(positions, total_stake);
        let occupied_bands = band_allocations.len();

        let concentration_flags = self.concentration_flags(positions, total_stake);
        let rebalance_suggestions = self.rebalance(&band_allocations, total_stake);

        let (current_point, efficient_frontier) = if positions.is_empty() {
            (None, Vec::new())
        } else {
            let current = stake_weights(positions, total_stake);
            (
                Some(frontier_point(positions, current)),
                efficient_frontier(positions, total_stake),
            )
        };

        OptimizationReport {
            position_count: positions.len(),
            total_stake,
            diversification_score: diversification_score(positions, total_stake, occupied_bands),
            occupied_bands,
            band_allocations,
            concentration_flags,
            position_limit_exceeded: positions.len() > self.limits.max_positions,
            below_min_diversification: occupied_bands < self.limits.min_diversification,
            rebalance_suggestions,
            current_point,
            efficient_frontier,
        }
    }

    fn concentration_flags(
        &self,
        positions: &[(&BetCandidate, &BetEvaluation)],
        total_stake: f64,
    ) -> Vec<ConcentrationFlag> {
        if total_stake <= 0.0 {
            return Vec::new();
        }
        let cap = self.limits.max_single_bet_ratio;
        positions
            .iter()
            .enumerate()
            .filter_map(|(index, (candidate, _))| {
                let stake_ratio = candidate.stake / total_stake;
                (stake_ratio > cap).then(|| ConcentrationFlag {
                    index,
                    label: candidate.label.clone(),
                    stake_ratio,
                    excess_stake: round_cents(candidate.stake - cap * total_stake),
                })
            })
            .collect()
    }

    /// Greedy transfers from over-weight to under-weight bands.
    ///
    /// Targets equal weight across the occupied bands, widened with the
    /// nearest empty bands when fewer than `min_diversification` are held.
    fn rebalance(&self, allocations: &[BandAllocation], total_stake: f64) -> Vec<RebalanceSuggestion> {
        if allocations.is_empty() || total_stake <= 0.0 {
            return Vec::new();
        }

        let mut weights = [0.0_f64; BAND_COUNT];
        let mut targeted = [false; BAND_COUNT];
        for a in allocations {
            weights[a.band.index()] = a.weight;
            targeted[a.band.index()] = true;
        }

        // Widen toward the heaviest band's neighbours first.
        let heaviest = allocations
            .iter()
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
            .map_or(0, |a| a.band.index());
        let wanted = self.limits.min_diversification.clamp(1, BAND_COUNT);
        let mut by_distance: Vec<usize> = (0..BAND_COUNT).collect();
        by_distance.sort_by_key(|&i| (i.abs_diff(heaviest), i));
        for i in by_distance {
            if targeted.iter().filter(|&&t| t).count() >= wanted {
                break;
            }
            targeted[i] = true;
        }

        let target_count = targeted.iter().filter(|&&t| t).count() as f64;
        let target = 1.0 / target_count;
        let threshold = self.limits.rebalance_threshold;

        let mut over: Vec<(usize, f64)> = Vec::new();
        let mut under: Vec<(usize, f64)> = Vec::new();
        for i in 0..BAND_COUNT {
            if !targeted[i] {
                continue;
            }
            let drift = weights[i] - target;
            if drift > threshold {
                over.push((i, drift));
            } else if -drift > threshold {
                under.push((i, -drift));
            }
        }
        over.sort_by(|a, b| b.1.total_cmp(&a.1));
        under.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut suggestions = Vec::new();
        let (mut oi, mut ui) = (0, 0);
        while oi < over.len() && ui < under.len() {
            let moved = over[oi].1.min(under[ui].1);
            let amount = round_cents(moved * total_stake);
            if amount > 0.0 {
                suggestions.push(RebalanceSuggestion {
                    from_band: OddsBand::ALL[over[oi].0],
                    to_band: OddsBand::ALL[under[ui].0],
                    amount,
                });
            }
            over[oi].1 -= moved;
            under[ui].1 -= moved;
            if over[oi].1 <= f64::EPSILON {
                oi += 1;
            }
            if under[ui].1 <= f64::EPSILON {
                ui += 1;
            }
        }
        suggestions
    }
}

fn band_allocations(
    positions: &[(&BetCandidate, &BetEvaluation)],
    total_stake: f64,
) -> Vec<BandAllocation> {
    let mut stakes = [0.0_f64; BAND_COUNT];
    let mut counts = [0usize; BAND_COUNT];
    let mut edge_stake = [0.0_f64; BAND_COUNT];

    for (candidate, evaluation) in positions {
        let i = OddsBand::from_odds(candidate.odds).index();
        stakes[i] += candidate.stake;
        counts[i] += 1;
        edge_stake[i] += evaluation.edge * candidate.stake;
    }

    OddsBand::ALL
        .iter()
        .filter(|band| counts[band.index()] > 0)
        .map(|&band| {
            let i = band.index();
            BandAllocation {
                band,
                positions: counts[i],
                stake: stakes[i],
                weight: if total_stake > 0.0 { stakes[i] / total_stake } else { 0.0 },
                expected_return: if stakes[i] > 0.0 { edge_stake[i] / stakes[i] } else { 0.0 },
            }
        })
        .collect()
}

fn diversification_score(
    positions: &[(&BetCandidate, &BetEvaluation)],
    total_stake: f64,
    occupied_bands: usize,
) -> f64 {
    let band_component = occupied_bands.min(BAND_COUNT) as f64 / BAND_COUNT as f64 * 60.0;

    let n = positions.len();
    let evenness = if n > 1 && total_stake > 0.0 {
        let hhi: f64 = positions
            .iter()
            .map(|(c, _)| (c.stake / total_stake).powi(2))
            .sum();
        let floor = 1.0 / n as f64;
        ((1.0 - hhi) / (1.0 - floor)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    (band_component + evenness * 40.0).clamp(0.0, 100.0)
}

fn stake_weights(positions: &[(&BetCandidate, &BetEvaluation)], total_stake: f64) -> Vec<f64> {
    positions.iter().map(|(c, _)| c.stake / total_stake).collect()
}

/// Expected return and risk per unit staked for a weight vector.
///
/// Per-bet return is `odds·X − 1` with `X ~ Bernoulli(p)`, so its variance
/// is `odds²·p·(1 − p)`. Bets are treated as independent.
fn frontier_point(positions: &[(&BetCandidate, &BetEvaluation)], weights: Vec<f64>) -> FrontierPoint {
    let (expected_return, variance) = positions.iter().zip(&weights).fold(
        (0.0, 0.0),
        |(mu, var), ((c, e), w)| {
            let p = c.win_probability;
            (mu + w * e.edge, var + w * w * c.odds * c.odds * p * (1.0 - p))
        },
    );
    FrontierPoint {
        expected_return,
        risk: variance.sqrt(),
        weights,
    }
}

/// Grid search over blends of the current, equal-weight and
/// Kelly-proportional portfolios, Pareto-filtered.
fn efficient_frontier(
    positions: &[(&BetCandidate, &BetEvaluation)],
    total_stake: f64,
) -> Vec<FrontierPoint> {
    let n = positions.len();
    let current = stake_weights(positions, total_stake);
    let equal = vec![1.0 / n as f64; n];
    let kelly_total: f64 = positions.iter().map(|(_, e)| e.kelly_fraction).sum();
    let kelly = if kelly_total > 0.0 {
        positions.iter().map(|(_, e)| e.kelly_fraction / kelly_total).collect()
    } else {
        equal.clone()
    };

    let mut points = Vec::new();
    for a in 0..=FRONTIER_STEPS {
        for b in 0..=(FRONTIER_STEPS - a) {
            let c = FRONTIER_STEPS - a - b;
            let (wa, wb, wc) = (
                a as f64 / FRONTIER_STEPS as f64,
                b as f64 / FRONTIER_STEPS as f64,
                c as f64 / FRONTIER_STEPS as f64,
            );
            let weights: Vec<f64> = (0..n)
                .map(|i| wa * current[i] + wb * equal[i] + wc * kelly[i])
                .collect();
            points.push(frontier_point(positions, weights));
        }
    }

    points.sort_by(|x, y| {
        x.risk
            .total_cmp(&y.risk)
            .then(y.expected_return.total_cmp(&x.expected_return))
    });
    let mut frontier: Vec<FrontierPoint> = Vec::new();
    for point in points {
        let dominated = frontier
            .last()
            .is_some_and(|best| point.expected_return <= best.expected_return);
        if !dominated {
            frontier.push(point);
        }
    }
    frontier
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
