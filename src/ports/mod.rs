//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `CandidateSource`: candidate wagers from the prediction pipeline
//! - `HistorySource`: settled outcomes and benchmark returns

pub mod candidate_source;
pub mod history_source;

pub use candidate_source::CandidateSource;
pub use history_source::HistorySource;
