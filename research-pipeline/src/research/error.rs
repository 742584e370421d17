//! Error types for the research pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by pipeline stages and surfaced to the supervisor
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Topic list could not be read
    #[error("failed to read input file {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Result file (or output directory) could not be written
    #[error("failed to write output file {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Result could not be encoded as JSON
    #[error("failed to encode result for topic '{topic}': {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// Processed-topics journal could not be read or appended
    #[error("processed-topics journal {} failed: {source}", path.display())]
    StateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stage on the other side of a handoff is gone
    #[error("{0} queue closed")]
    QueueClosed(&'static str),

    /// Configuration rejected during validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline task panicked
    #[error("task {task} panicked: {message}")]
    TaskPanicked { task: String, message: String },
}

impl PipelineError {
    /// True for failures to read the topic list
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InputRead { .. })
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
