//! History Source Port - Settled Outcome Persistence
//!
//! Defines the interface to the store of realized bet outcomes and the
//! optional benchmark series used for beta and the information ratio.

use async_trait::async_trait;

use crate::domain::snapshot::HistoricalOutcome;

/// Trait for persistence providers of settled bets.
#[async_trait]
pub trait HistorySource: Send + Sync + 'static {
  /// Load every settled outcome. Order is not guaranteed; the
  /// aggregator sorts by timestamp.
  async fn fetch_outcomes(&self) -> anyhow::Result<Vec<HistoricalOutcome>>;

  /// Load the benchmark return series aligned with the outcomes, if any.
  async fn fetch_benchmark(&self) -> anyhow::Result<Option<Vec<f64>>>;
}
