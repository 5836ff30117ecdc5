//! Integration Tests - End-to-end Analysis Pipeline Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;

use betting_portfolio_analytics::adapters::persistence::JsonlStore;
use betting_portfolio_analytics::config::AnalysisConfig;
use betting_portfolio_analytics::domain::bet::{BetCandidate, RecommendationTier};
use betting_portfolio_analytics::domain::recommendation::RecommendationKind;
use betting_portfolio_analytics::domain::scenario::SimulationBudget;
use betting_portfolio_analytics::domain::snapshot::HistoricalOutcome;
use betting_portfolio_analytics::usecases::{AnalysisRunner, AnalysisStatus, PortfolioAnalyzer};

// ---- Mock Definitions ----

mock! {
    pub Candidates {}

    #[async_trait::async_trait]
    impl betting_portfolio_analytics::ports::CandidateSource for Candidates {
        async fn fetch_candidates(&self) -> anyhow::Result<Vec<BetCandidate>>;
    }
}

mock! {
    pub History {}

    #[async_trait::async_trait]
    impl betting_portfolio_analytics::ports::HistorySource for History {
        async fn fetch_outcomes(&self) -> anyhow::Result<Vec<HistoricalOutcome>>;
        async fn fetch_benchmark(&self) -> anyhow::Result<Option<Vec<f64>>>;
    }
}

// ---- Fixtures ----

fn ts(hour: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + hour * 3600, 0).unwrap()
}

fn equal_stake_history(returns: &[f64]) -> Vec<HistoricalOutcome> {
    returns
        .iter()
        .enumerate()
        .map(|(i, &r)| HistoricalOutcome::new(100.0, r, ts(i as i64)))
        .collect()
}

fn sample_candidates() -> Vec<BetCandidate> {
    vec![
        BetCandidate::new(10.0, 0.12, 10.0, 0.7).with_label("long-shot"),
        BetCandidate::new(1.5, 0.9, 10.0, 0.8).with_label("favourite"),
        BetCandidate::new(5.0, 0.25, 10.0, 0.7).with_label("mid"),
    ]
}

fn analyzer(trials: usize) -> PortfolioAnalyzer {
    PortfolioAnalyzer::new(AnalysisConfig::default().with_monte_carlo_trials(trials)).unwrap()
}

fn mocks(
    candidates: Vec<BetCandidate>,
    outcomes: Vec<HistoricalOutcome>,
) -> (MockCandidates, MockHistory) {
    let mut source = MockCandidates::new();
    source
        .expect_fetch_candidates()
        .times(1)
        .returning(move || Ok(candidates.clone()));

    let mut history = MockHistory::new();
    history
        .expect_fetch_outcomes()
        .times(1)
        .returning(move || Ok(outcomes.clone()));
    history
        .expect_fetch_benchmark()
        .times(1)
        .returning(|| Ok(None));
    (source, history)
}

// ---- Concrete scenarios ----

#[test]
fn test_long_shot_evaluation() {
    let eval = analyzer(100)
        .evaluate_single_bet(&BetCandidate::new(10.0, 0.12, 10.0, 0.7))
        .unwrap();
    assert!((eval.expected_value - 1.2).abs() < 1e-12);
    // (9 × 0.12 − 0.88) / 9
    assert!((eval.kelly_fraction - 0.2 / 9.0).abs() < 1e-12);
    assert!(eval.kelly_fraction < 0.25);
}

#[test]
fn test_heavy_favourite_kelly_is_clamped() {
    let eval = analyzer(100)
        .evaluate_single_bet(&BetCandidate::new(1.5, 0.9, 10.0, 0.8))
        .unwrap();
    assert!((eval.expected_value - 1.35).abs() < 1e-12);
    assert!((eval.full_kelly_fraction - 0.7).abs() < 1e-12);
    assert!((eval.kelly_fraction - 0.25).abs() < f64::EPSILON);
}

#[test]
fn test_equal_stake_history_statistics() {
    let history = equal_stake_history(&[0.1, -0.2, 0.05, -0.1, 0.3]);
    let analysis = analyzer(100).analyze_portfolio(&[], &history, None).unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    let snapshot = analysis.snapshot.unwrap();
    assert!((snapshot.mean_return - 0.03).abs() < 1e-12);
    assert!((snapshot.win_rate - 0.6).abs() < 1e-12);

    let risk = analysis.risk_profile.unwrap();
    assert!(risk.var_99 <= risk.var_95);
    assert!(risk.max_drawdown <= 0.0);
}

#[test]
fn test_empty_candidates_return_empty_portfolio() {
    let analysis = analyzer(100).analyze_portfolio(&[], &[], None).unwrap();
    assert_eq!(analysis.status, AnalysisStatus::EmptyPortfolio);
    assert!(analysis.risk_profile.is_none());
    assert!(analysis.scenarios.is_none());
    assert!(analysis.evaluations.is_empty());
}

#[test]
fn test_monte_carlo_is_reproducible() {
    let history = equal_stake_history(&[1.5, -1.0, -1.0, 4.0, -1.0, 0.8, -1.0, 2.2, -1.0, -1.0]);
    let a = analyzer(1000).analyze_portfolio(&[], &history, None).unwrap();
    let b = analyzer(1000).analyze_portfolio(&[], &history, None).unwrap();

    let (sa, sb) = (a.scenarios.unwrap(), b.scenarios.unwrap());
    assert_eq!(sa.monte_carlo.completed_trials, 1000);
    let (ma, mb) = (sa.monte_carlo.summary.unwrap(), sb.monte_carlo.summary.unwrap());
    assert_eq!(ma.worst_case, mb.worst_case);
    assert_eq!(ma.expected_case, mb.expected_case);
    assert_eq!(ma.best_case, mb.best_case);
}

// ---- Runner over mocked ports ----

#[tokio::test]
async fn test_runner_with_mocked_ports() {
    let history = equal_stake_history(&[0.1, -0.2, 0.05, -0.1, 0.3, -1.0, 0.4]);
    let (source, history) = mocks(sample_candidates(), history);

    let runner = AnalysisRunner::new(Arc::new(source), Arc::new(history), analyzer(200));
    let analysis = runner.run().await.unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert_eq!(analysis.evaluations.len(), 3);
    assert!(analysis.rejected.is_empty());
    assert!(analysis.optimization.is_some());
    assert!(analysis.significance.is_some());
    assert!(analysis.evaluations.iter().all(|e| e.kelly_fraction <= 0.25));
}

#[tokio::test]
async fn test_runner_without_history_is_evaluation_only() {
    let (source, history) = mocks(sample_candidates(), Vec::new());
    let runner = AnalysisRunner::new(Arc::new(source), Arc::new(history), analyzer(200));
    let analysis = runner.run().await.unwrap();

    assert_eq!(analysis.status, AnalysisStatus::EvaluationOnly);
    assert!(analysis.risk_profile.is_none());
    assert!(
        analysis
            .recommendations
            .iter()
            .any(|r| r.kind == RecommendationKind::InsufficientData)
    );
}

#[tokio::test]
async fn test_runner_propagates_port_failure() {
    let mut source = MockCandidates::new();
    source
        .expect_fetch_candidates()
        .returning(|| Ok(Vec::new()));
    let mut history = MockHistory::new();
    history
        .expect_fetch_outcomes()
        .returning(|| Err(anyhow::anyhow!("disk unavailable")));
    history.expect_fetch_benchmark().returning(|| Ok(None));

    let runner = AnalysisRunner::new(Arc::new(source), Arc::new(history), analyzer(10));
    let err = runner.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to fetch history"));
}

#[tokio::test]
async fn test_runner_honours_cancelled_budget() {
    let history = equal_stake_history(&[0.2, -1.0, 0.5, -1.0, 1.2]);
    let (source, history) = mocks(Vec::new(), history);
    let runner = AnalysisRunner::new(Arc::new(source), Arc::new(history), analyzer(500));

    let budget = SimulationBudget::unbounded();
    budget.cancel_flag().store(true, Ordering::Relaxed);
    let analysis = runner.run_with_budget(budget).await.unwrap();

    let mc = analysis.scenarios.unwrap().monte_carlo;
    assert!(mc.cancelled);
    assert_eq!(mc.completed_trials, 0);
    assert!(mc.summary.is_none());
}

#[tokio::test]
async fn test_invalid_candidates_are_reported() {
    let candidates = vec![
        BetCandidate::new(10.0, 0.12, 10.0, 0.7),
        BetCandidate::new(3.0, 1.4, 10.0, 0.7).with_label("bad-probability"),
    ];
    let (source, history) = mocks(candidates, Vec::new());
    let runner = AnalysisRunner::new(Arc::new(source), Arc::new(history), analyzer(10));
    let analysis = runner.run().await.unwrap();

    assert_eq!(analysis.evaluations.len(), 1);
    assert_eq!(analysis.rejected.len(), 1);
    assert_eq!(analysis.rejected[0].index, 1);
    assert_eq!(analysis.rejected[0].label.as_deref(), Some("bad-probability"));
}

// ---- JSONL store end-to-end ----

#[test]
fn test_jsonl_store_end_to_end() {
    let dir = std::env::temp_dir().join(format!("portfolio-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let candidates_path = dir.join("candidates.jsonl");
    let lines: Vec<String> = sample_candidates()
        .iter()
        .map(|c| serde_json::to_string(c).unwrap())
        .collect();
    std::fs::write(&candidates_path, lines.join("\n")).unwrap();

    let store = Arc::new(JsonlStore::new(&candidates_path, dir.join("history.jsonl"), None));

    tokio_test::block_on(async {
        for (i, r) in [0.5, -1.0, 2.0, -1.0, 0.3, -1.0].into_iter().enumerate() {
            store
                .append_outcome(&HistoricalOutcome::new(20.0, r, ts(i as i64)))
                .await
                .unwrap();
        }
    });

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let runner = AnalysisRunner::new(Arc::clone(&store), Arc::clone(&store), analyzer(100));
    let analysis = runtime.block_on(runner.run()).unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Complete);
    assert_eq!(analysis.snapshot.as_ref().unwrap().observations, 6);
    let favourite = analysis
        .evaluations
        .iter()
        .find(|e| e.label.as_deref() == Some("favourite"))
        .unwrap();
    assert!(favourite.recommendation_tier <= RecommendationTier::Weak);
}
