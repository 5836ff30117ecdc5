//! Kelly Criterion position sizing for decimal-odds wagers.
//!
//! The full Kelly fraction maximizes long-run geometric growth for a known
//! edge, but model error in the win probability makes it dangerous to
//! stake directly. Every fraction leaving this module is clamped to the
//! single-bet cap (25% by default).

/// Single-bet exposure cap applied to every Kelly fraction.
pub const MAX_KELLY_FRACTION: f64 = 0.25;

/// Kelly Criterion calculator for decimal odds.
#[derive(Debug, Clone)]
pub struct KellyCriterion {
    /// Multiplier on full Kelly (1.0 = full Kelly, 0.25 = quarter-Kelly).
    multiplier: f64,
    /// Maximum stake as fraction of bankroll.
    max_fraction: f64,
}

impl KellyCriterion {
    /// Creates a calculator with the given Kelly multiplier and cap.
    ///
    /// Both are clamped into [0, 1]; the cap additionally never exceeds
    /// [`MAX_KELLY_FRACTION`].
    pub fn new(multiplier: f64, max_fraction: f64) -> Self {
        Self {
            multiplier: multiplier.clamp(0.0, 1.0),
            max_fraction: max_fraction.clamp(0.0, MAX_KELLY_FRACTION),
        }
    }

    /// Unclamped Kelly fraction for decimal odds.
    ///
    /// Kelly formula for a binary wager:
    ///   f* = (b * p - q) / b
    /// where:
    ///   b = odds - 1 (net payout per unit staked)
    ///   p = win probability
    ///   q = 1 - p
    ///
    /// Negative values (unfavourable bets) are returned as-is; callers
    /// that size positions should use [`Self::optimal_fraction`].
    pub fn full_fraction(odds: f64, win_probability: f64) -> f64 {
        let b = odds - 1.0;
        if b <= 0.0 {
            return 0.0;
        }
        let q = 1.0 - win_probability;
        (b * win_probability - q) / b
    }

    /// Kelly fraction scaled by the multiplier and clamped to [0, cap].
    pub fn optimal_fraction(&self, odds: f64, win_probability: f64) -> f64 {
        let full = Self::full_fraction(odds, win_probability);
        if full <= 0.0 || full.is_nan() {
            return 0.0;
        }
        (full * self.multiplier).min(self.max_fraction)
    }

    /// Stake amount for a bankroll, rounded to cents.
    pub fn stake_for(&self, bankroll: f64, odds: f64, win_probability: f64) -> f64 {
        if bankroll <= 0.0 || !bankroll.is_finite() {
            return 0.0;
        }
        let fraction = self.optimal_fraction(odds, win_probability);
        (bankroll * fraction * 100.0).round() / 100.0
    }

    /// Kelly multiplier in use.
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Stake cap in use.
    pub const fn max_fraction(&self) -> f64 {
        self.max_fraction
    }
}

impl Default for KellyCriterion {
    /// Default: full Kelly capped at 25% of bankroll.
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            max_fraction: MAX_KELLY_FRACTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelly_long_shot_edge() {
        // b = 9, p = 0.12 -> (1.08 - 0.88) / 9
        let f = KellyCriterion::default().optimal_fraction(10.0, 0.12);
        assert!((f - 0.2 / 9.0).abs() < 1e-12);
        assert!(f < MAX_KELLY_FRACTION);
    }

    #[test]
    fn test_kelly_clamped_to_cap() {
        // b = 0.5, p = 0.9 -> (0.45 - 0.1) / 0.5 = 0.7
        let full = KellyCriterion::full_fraction(1.5, 0.9);
        assert!((full - 0.7).abs() < 1e-12);
        let f = KellyCriterion::default().optimal_fraction(1.5, 0.9);
        assert!((f - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kelly_negative_edge_is_zero() {
        let f = KellyCriterion::default().optimal_fraction(2.0, 0.3);
        assert_eq!(f, 0.0);
        assert!(KellyCriterion::full_fraction(2.0, 0.3) < 0.0);
    }

    #[test]
    fn test_quarter_kelly_smaller() {
        let full = KellyCriterion::default();
        let quarter = KellyCriterion::new(0.25, MAX_KELLY_FRACTION);
        assert!(quarter.optimal_fraction(4.0, 0.3) < full.optimal_fraction(4.0, 0.3));
    }

    #[test]
    fn test_cap_never_exceeds_single_bet_limit() {
        let k = KellyCriterion::new(1.0, 0.9);
        assert!((k.max_fraction() - MAX_KELLY_FRACTION).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stake_rounded_to_cents() {
        let k = KellyCriterion::default();
        let stake = k.stake_for(1000.0, 10.0, 0.12);
        assert!((stake - 22.22).abs() < 1e-9);
        assert_eq!(k.stake_for(-5.0, 10.0, 0.12), 0.0);
    }
}
