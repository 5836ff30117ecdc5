//! Analytics Benchmarks — Evaluation and Simulation Throughput
//!
//! Benchmarks the bet evaluator, the risk engine and the Monte Carlo
//! simulation, the three stages whose cost scales with input size.
//!
//! Run with: cargo bench --bench analytics_bench

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use betting_portfolio_analytics::domain::bet::BetCandidate;
use betting_portfolio_analytics::domain::evaluator::BetEvaluator;
use betting_portfolio_analytics::domain::risk::RiskMetricsEngine;
use betting_portfolio_analytics::domain::scenario::{
    MonteCarloConfig, ScenarioEngine, SimulationBudget,
};
use betting_portfolio_analytics::domain::snapshot::{HistoricalOutcome, PortfolioSnapshot};
use betting_portfolio_analytics::usecases::PortfolioAnalyzer;

fn candidates(n: usize) -> Vec<BetCandidate> {
    (0..n)
        .map(|i| {
            let odds = 1.5 + (i % 20) as f64;
            BetCandidate::new(odds, (1.1 / odds).min(0.95), 10.0, 0.7)
        })
        .collect()
}

fn history(n: usize) -> Vec<HistoricalOutcome> {
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    (0..n)
        .map(|i| {
            let r = if i % 3 == 0 { 1.8 } else { -1.0 };
            HistoricalOutcome::new(10.0, r, start + chrono::Duration::hours(i as i64))
        })
        .collect()
}

/// Benchmark a single candidate evaluation.
fn bench_evaluate(c: &mut Criterion) {
    let evaluator = BetEvaluator::default();
    let candidate = BetCandidate::new(10.0, 0.12, 10.0, 0.7);

    c.bench_function("evaluate_single_bet", |b| {
        b.iter(|| evaluator.evaluate(black_box(&candidate)));
    });
}

/// Benchmark parallel batch evaluation.
fn bench_evaluate_batch(c: &mut Criterion) {
    let evaluator = BetEvaluator::default();
    let batch = candidates(1000);

    c.bench_function("evaluate_batch_1000", |b| {
        b.iter(|| evaluator.evaluate_batch(black_box(&batch)));
    });
}

/// Benchmark the risk profile over growing histories.
fn bench_risk_profile(c: &mut Criterion) {
    let engine = RiskMetricsEngine::default();
    let mut group = c.benchmark_group("risk_profile");
    for n in [100, 1_000, 10_000] {
        let Ok(snapshot) = PortfolioSnapshot::from_outcomes(&history(n)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &snapshot, |b, s| {
            b.iter(|| engine.compute(black_box(s), None));
        });
    }
    group.finish();
}

/// Benchmark Monte Carlo with the default 1000 trials.
fn bench_monte_carlo(c: &mut Criterion) {
    let engine = ScenarioEngine::new(252.0, MonteCarloConfig::default());
    let Ok(snapshot) = PortfolioSnapshot::from_outcomes(&history(250)) else {
        return;
    };

    c.bench_function("monte_carlo_1000_trials", |b| {
        b.iter(|| engine.monte_carlo(black_box(&snapshot), &SimulationBudget::unbounded()));
    });
}

/// Benchmark the full analysis pipeline.
fn bench_full_analysis(c: &mut Criterion) {
    let analyzer = PortfolioAnalyzer::default();
    let batch = candidates(10);
    let past = history(250);

    c.bench_function("analyze_portfolio", |b| {
        b.iter(|| analyzer.analyze_portfolio(black_box(&batch), black_box(&past), None));
    });
}

criterion_group!(
    benches,
    bench_evaluate,
    bench_evaluate_batch,
    bench_risk_profile,
    bench_monte_carlo,
    bench_full_analysis,
);
criterion_main!(benches);
