//! Persistence Adapters - JSONL-based File Storage
//!
//! Implements the supplier ports using JSON Lines files for candidates,
//! settled outcomes and the benchmark series. No database dependency.

pub mod jsonl;

pub use jsonl::JsonlStore;
