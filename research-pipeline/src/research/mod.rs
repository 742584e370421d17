//! Topic research pipeline
//!
//! Polls a topic list, researches every topic it has not seen before with a
//! fixed pool of workers, and appends each result to a per-topic JSON file
//! through a single writer.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod processed;
pub mod source;
pub mod types;
pub mod worker;
pub mod writer;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use generator::{Generator, OpenAiGenerator};
pub use pipeline::Pipeline;
pub use processed::{InMemoryProcessedTopics, JournalProcessedTopics, ProcessedTopics};
pub use source::PollErrorPolicy;
pub use types::{ResearchResult, Topic, WorkerId};
