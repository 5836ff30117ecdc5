//! JSONL Store - File-backed Candidate and History Sources
//!
//! Reads candidate wagers and settled outcomes from JSON Lines files,
//! one self-contained JSON object per line. Malformed lines are skipped
//! with a warning so one bad record never hides the rest of the file.
//! Outcomes are appended in the same format.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::config::DataConfig;
use crate::domain::bet::BetCandidate;
use crate::domain::snapshot::HistoricalOutcome;
use crate::ports::{CandidateSource, HistorySource};

/// JSONL-backed implementation of both supplier ports.
///
/// A missing candidates or history file reads as empty. A configured but
/// missing benchmark file reads as "no benchmark".
#[derive(Debug, Clone)]
pub struct JsonlStore {
    candidates_path: PathBuf,
    history_path: PathBuf,
    benchmark_path: Option<PathBuf>,
}

impl JsonlStore {
    pub fn new(
        candidates_path: impl Into<PathBuf>,
        history_path: impl Into<PathBuf>,
        benchmark_path: Option<PathBuf>,
    ) -> Self {
        Self {
            candidates_path: candidates_path.into(),
            history_path: history_path.into(),
            benchmark_path,
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            config.candidates_path.clone(),
            config.history_path.clone(),
            config.benchmark_path.clone(),
        )
    }

    /// Load every well-formed candidate.
    #[instrument(skip(self), fields(path = %self.candidates_path.display()))]
    pub async fn load_candidates(&self) -> Result<Vec<BetCandidate>> {
        let candidates = read_jsonl(&self.candidates_path).await?;
        info!(count = candidates.len(), "Loaded candidates");
        Ok(candidates)
    }

    /// Load every well-formed outcome, in file order.
    #[instrument(skip(self), fields(path = %self.history_path.display()))]
    pub async fn load_outcomes(&self) -> Result<Vec<HistoricalOutcome>> {
        let outcomes = read_jsonl(&self.history_path).await?;
        info!(count = outcomes.len(), "Loaded outcomes");
        Ok(outcomes)
    }

    /// Load the benchmark series: one number per line.
    #[instrument(skip(self))]
    pub async fn load_benchmark(&self) -> Result<Option<Vec<f64>>> {
        let Some(path) = &self.benchmark_path else {
            return Ok(None);
        };
        if !fs::try_exists(path).await.unwrap_or(false) {
            warn!(file = %path.display(), "Benchmark file not found, continuing without benchmark");
            return Ok(None);
        }
        let series: Vec<f64> = read_jsonl(path).await?;
        info!(count = series.len(), "Loaded benchmark series");
        Ok(Some(series))
    }

    /// Append a settled outcome to the history file.
    #[instrument(skip(self, outcome), fields(timestamp = %outcome.timestamp))]
    pub async fn append_outcome(&self, outcome: &HistoricalOutcome) -> Result<()> {
        if let Some(parent) = self.history_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create history directory")?;
        }

        let mut json = serde_json::to_string(outcome).context("Failed to serialize outcome")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)
            .await
            .context("Failed to open history file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write outcome")?;
        file.flush().await.context("Failed to flush history file")?;

        debug!("Outcome appended");
        Ok(())
    }
}

#[async_trait]
impl CandidateSource for JsonlStore {
    async fn fetch_candidates(&self) -> Result<Vec<BetCandidate>> {
        self.load_candidates().await
    }
}

#[async_trait]
impl HistorySource for JsonlStore {
    async fn fetch_outcomes(&self) -> Result<Vec<HistoricalOutcome>> {
        self.load_outcomes().await
    }

    async fn fetch_benchmark(&self) -> Result<Option<Vec<f64>>> {
        self.load_benchmark().await
    }
}

/// Parse a JSONL file, skipping blank and malformed lines.
async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(file = %path.display(), "File not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed record"
                );
            }
        }
    }
    Ok(records)
}
