//! Data structures for the research pipeline

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::pipeline_utils::serde_duration;

/// A trimmed, non-empty line of the input file
pub type Topic = String;

/// Identifier of a worker in the pool (0-indexed)
pub type WorkerId = usize;

/// Result of one successful research call
///
/// Serialized with the record layout of the result files:
/// `Content`, `Date`, `Took` (nanoseconds), `Topic`, `WorkerId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Date")]
    pub generated_at: DateTime<Local>,
    #[serde(rename = "Took", with = "serde_duration::nanos")]
    pub took: Duration,
    #[serde(rename = "Topic")]
    pub topic: Topic,
    #[serde(rename = "WorkerId")]
    pub worker_id: WorkerId,
}

/// Long-running task spawned by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineTask {
    Source,
    Worker(WorkerId),
    Writer,
}

impl fmt::Display for PipelineTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "topic-source"),
            Self::Worker(id) => write!(f, "worker-{}", id),
            Self::Writer => write!(f, "writer"),
        }
    }
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub cycle: u64,
    /// Topics parsed from the input file
    pub found: usize,
    /// Topics accepted by a worker
    pub enqueued: usize,
    /// Topics already in the processed set
    pub skipped_processed: usize,
    /// Topics a worker is still researching
    pub skipped_pending: usize,
}

impl PollSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_processed + self.skipped_pending
    }
}
