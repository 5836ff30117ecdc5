//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! engine's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `PortfolioAnalyzer`: synchronous evaluate / analyze pipeline
//! - `AnalysisRunner`: fetches inputs from the ports and runs the analyzer

pub mod analysis_runner;
pub mod portfolio_analyzer;

pub use analysis_runner::AnalysisRunner;
pub use portfolio_analyzer::{
  AnalysisStatus, PortfolioAnalysis, PortfolioAnalyzer, RejectedCandidate,
};
