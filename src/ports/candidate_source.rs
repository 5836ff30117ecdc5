//! Candidate Source Port - Upstream Wager Supply
//!
//! The prediction pipeline that produces candidate wagers lives outside
//! this engine. Adapters implement this trait to hand its output over.

use async_trait::async_trait;

use crate::domain::bet::BetCandidate;

/// Trait for suppliers of candidate wagers.
///
/// Candidates are returned as supplied; validation happens in the
/// analyzer so that invalid records are reported, not silently dropped.
#[async_trait]
pub trait CandidateSource: Send + Sync + 'static {
  /// Fetch the current batch of candidate wagers.
  async fn fetch_candidates(&self) -> anyhow::Result<Vec<BetCandidate>>;
}
