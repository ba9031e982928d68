//! Batch job type definitions
//!
//! Supporting types for batch job progress reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress of a running batch job
///
/// Published before and after every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStatus {
    /// Job name (e.g., "compute-page-hashes")
    pub job: String,
    /// Items processed so far in this run
    pub processed: u64,
    /// Items pending when the run started
    pub total: u64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// False once the run has finished
    pub active: bool,
}

impl ProgressStatus {
    /// Percentage complete (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return if self.active { 0.0 } else { 100.0 };
        }
        (self.processed.min(self.total) as f64 / self.total as f64) * 100.0
    }
}

/// Terminal status of a batch job run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRunStatus {
    /// Reader reached end of data
    Completed,
    /// Stop requested; ended between chunks
    Stopped,
    /// Reader or writer failure aborted the run
    Failed,
}

impl std::fmt::Display for JobRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobRunStatus::Completed => write!(f, "COMPLETED"),
            JobRunStatus::Stopped => write!(f, "STOPPED"),
            JobRunStatus::Failed => write!(f, "FAILED"),
        }
    }
}
