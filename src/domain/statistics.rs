//! Descriptive statistics and hypothesis tests over return samples.
//!
//! Moment statistics use population formulas. Hypothesis tests use real
//! sampling distributions from `statrs`; nothing here returns placeholder
//! values.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use super::error::{AnalyticsError, AnalyticsResult, DataGap};

// ────────────────────────────────────────────
// Descriptive statistics
// ────────────────────────────────────────────

/// Arithmetic mean; 0 for an empty slice.
///
/// Exact for a constant sample, so every deviation from it is exactly 0.
pub fn mean(values: &[f64]) -> f64 {
    match values.first() {
        None => 0.0,
        Some(&first) if is_constant(values) => first,
        Some(_) => values.iter().sum::<f64>() / values.len() as f64,
    }
}

/// True when every value equals the first (vacuously for an empty slice).
pub fn is_constant(values: &[f64]) -> bool {
    values.first().is_none_or(|&first| values.iter().all(|&v| v == first))
}

/// Population variance; 0 for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn population_std_dev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Sample (n − 1) variance; 0 below two observations.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Returns a sorted copy, NaN-tolerant.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Linearly interpolated quantile of an already-sorted slice.
///
/// `q` is clamped to [0, 1]. Monotone non-decreasing in `q`.
pub fn quantile_sorted(sorted_values: &[f64], q: f64) -> f64 {
    match sorted_values.len() {
        0 => 0.0,
        1 => sorted_values[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted_values[lo] + (sorted_values[hi] - sorted_values[lo]) * frac
        }
    }
}

/// Median of an unsorted slice.
pub fn median(values: &[f64]) -> f64 {
    quantile_sorted(&sorted(values), 0.5)
}

/// Population skewness. `None` below 3 observations or for zero variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let m = mean(values);
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return None;
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    Some(m3 / m2.powf(1.5))
}

/// Population excess kurtosis. `None` below 4 observations or for zero variance.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    if values.len() < 4 {
        return None;
    }
    let m = mean(values);
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return None;
    }
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    Some(m4 / (m2 * m2) - 3.0)
}

/// Population covariance of two equal-length series.
pub fn covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let sum: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    Some(sum / x.len() as f64)
}

/// Pearson correlation. `None` for mismatched lengths, fewer than two
/// points, or a constant series.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 {
        return None;
    }
    let cov = covariance(x, y)?;
    let sx = population_std_dev(x);
    let sy = population_std_dev(y);
    if sx <= f64::EPSILON || sy <= f64::EPSILON {
        return None;
    }
    Some((cov / (sx * sy)).clamp(-1.0, 1.0))
}

/// Lag-1 autocorrelation: positive values indicate streaky results.
pub fn lag1_autocorrelation(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    pearson_correlation(&values[..values.len() - 1], &values[1..])
}

// ────────────────────────────────────────────
// Hypothesis tests
// ────────────────────────────────────────────

/// Outcome of a two-sided hypothesis test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisTest {
    /// Test name for reports.
    pub test: &'static str,
    /// Test statistic (t or z).
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Degrees of freedom, for t-tests.
    pub degrees_of_freedom: Option<f64>,
    /// Observed effect: mean difference (t-tests) or U statistic.
    pub effect: f64,
}

impl HypothesisTest {
    /// True when the null hypothesis is rejected at `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Two-sided p-value for a t statistic.
fn student_t_p_value(t: f64, df: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

fn standard_normal_p_value(z: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(z.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// t statistic for an effect and a standard error, handling the
/// zero-variance case.
fn t_statistic(effect: f64, standard_error: f64) -> f64 {
    if standard_error > f64::EPSILON {
        effect / standard_error
    } else if effect.abs() <= f64::EPSILON {
        0.0
    } else {
        f64::INFINITY.copysign(effect)
    }
}

/// One-sample t-test of `mean(values) == mu`.
///
/// # Errors
/// `InsufficientHistory` below two observations.
pub fn one_sample_t_test(values: &[f64], mu: f64) -> AnalyticsResult<HypothesisTest> {
    let n = values.len();
    if n < 2 {
        return Err(AnalyticsError::insufficient_history("one_sample_t_test", 2, n));
    }
    let effect = mean(values) - mu;
    let se = (sample_variance(values) / n as f64).sqrt();
    let t = t_statistic(effect, se);
    let df = (n - 1) as f64;

    Ok(HypothesisTest {
        test: "one_sample_t",
        statistic: t,
        p_value: student_t_p_value(t, df),
        degrees_of_freedom: Some(df),
        effect,
    })
}

/// Welch's unequal-variance two-sample t-test of `mean(a) == mean(b)`.
///
/// # Errors
/// `InsufficientHistory` when either sample has fewer than two observations.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> AnalyticsResult<HypothesisTest> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return Err(AnalyticsError::insufficient_history("welch_t_test", 2, n1.min(n2)));
    }
    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let v1 = sample_variance(a) / n1f;
    let v2 = sample_variance(b) / n2f;
    let effect = mean(a) - mean(b);
    let se = (v1 + v2).sqrt();
    let t = t_statistic(effect, se);

    // Welch–Satterthwaite; falls back to pooled df for zero variance.
    let denom = v1 * v1 / (n1f - 1.0) + v2 * v2 / (n2f - 1.0);
    let df = if denom > 0.0 {
        (v1 + v2).powi(2) / denom
    } else {
        n1f + n2f - 2.0
    };

    Ok(HypothesisTest {
        test: "welch_t",
        statistic: t,
        p_value: student_t_p_value(t, df),
        degrees_of_freedom: Some(df),
        effect,
    })
}

/// Mann-Whitney U test (normal approximation, tie-corrected, with
/// continuity correction).
///
/// `effect` is U for the first sample.
///
/// # Errors
/// `InsufficientHistory` when either sample has fewer than two observations.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> AnalyticsResult<HypothesisTest> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return Err(AnalyticsError::insufficient_history("mann_whitney_u", 2, n1.min(n2)));
    }

    let mut pooled: Vec<(f64, bool)> = a
        .iter()
        .map(|&v| (v, true))
        .chain(b.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

    // Average ranks over tie groups; accumulate the tie correction term.
    let n = pooled.len();
    let mut rank_sum_a = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        let ties = (j - i + 1) as f64;
        tie_term += ties.powi(3) - ties;
        rank_sum_a += pooled[i..=j].iter().filter(|(_, in_a)| *in_a).count() as f64 * avg_rank;
        i = j + 1;
    }

    let (n1f, n2f, nf) = (n1 as f64, n2 as f64, n as f64);
    let u1 = rank_sum_a - n1f * (n1f + 1.0) / 2.0;
    let mean_u = n1f * n2f / 2.0;
    let var_u = n1f * n2f / 12.0 * ((nf + 1.0) - tie_term / (nf * (nf - 1.0)));

    let (z, p_value) = if var_u > 0.0 {
        let diff = u1 - mean_u;
        let corrected = (diff.abs() - 0.5).max(0.0).copysign(diff);
        let z = corrected / var_u.sqrt();
        (z, standard_normal_p_value(z))
    } else {
        (0.0, 1.0)
    };

    Ok(HypothesisTest {
        test: "mann_whitney_u",
        statistic: z,
        p_value,
        degrees_of_freedom: None,
        effect: u1,
    })
}

// ────────────────────────────────────────────
// Significance report
// ────────────────────────────────────────────

/// Whether the realized edge is real and whether performance drifted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificanceReport {
    /// One-sample t-test of mean return against zero.
    pub edge_test: Option<HypothesisTest>,
    /// Welch t-test, earlier half against later half.
    pub drift_t_test: Option<HypothesisTest>,
    /// Mann-Whitney U, earlier half against later half.
    pub drift_rank_test: Option<HypothesisTest>,
    pub earlier_mean: Option<f64>,
    pub later_mean: Option<f64>,
    pub data_gaps: Vec<DataGap>,
}

impl SignificanceReport {
    /// Runs the edge and drift tests over chronologically ordered returns.
    ///
    /// Tests that lack data are left `None` and recorded as gaps.
    pub fn from_returns(returns: &[f64]) -> Self {
        let mut data_gaps = Vec::new();
        let edge_test = gap_on_error(one_sample_t_test(returns, 0.0), &mut data_gaps);

        let (earlier, later) = returns.split_at(returns.len() / 2);
        let drift_t_test = gap_on_error(welch_t_test(earlier, later), &mut data_gaps);
        let drift_rank_test = gap_on_error(mann_whitney_u(earlier, later), &mut data_gaps);

        Self {
            edge_test,
            drift_t_test,
            drift_rank_test,
            earlier_mean: (!earlier.is_empty()).then(|| mean(earlier)),
            later_mean: (!later.is_empty()).then(|| mean(later)),
            data_gaps,
        }
    }

    /// True when the edge test rejects "mean return is zero" at `alpha`.
    pub fn edge_is_significant(&self, alpha: f64) -> bool {
        self.edge_test.as_ref().is_some_and(|t| t.is_significant(alpha))
    }

    /// True when both drift tests agree the later half is significantly
    /// worse than the earlier half.
    pub fn has_deteriorated(&self, alpha: f64) -> bool {
        let worse = matches!((self.earlier_mean, self.later_mean), (Some(e), Some(l)) if l < e);
        let significant = [&self.drift_t_test, &self.drift_rank_test]
            .iter()
            .all(|t| t.as_ref().is_some_and(|t| t.is_significant(alpha)));
        worse && significant
    }
}

fn gap_on_error(
    result: AnalyticsResult<HypothesisTest>,
    gaps: &mut Vec<DataGap>,
) -> Option<HypothesisTest> {
    match result {
        Ok(test) => Some(test),
        Err(AnalyticsError::InsufficientHistory {
            statistic,
            required,
            available,
        }) => {
            gaps.push(DataGap::new(statistic, required, available));
            None
        }
        Err(_) => None,
    }
}
