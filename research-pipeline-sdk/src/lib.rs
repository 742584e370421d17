use serde::{Deserialize, Serialize};

// Re-export async trait for convenience
pub use async_trait::async_trait;

/// Prefix that marks a structured event line on stderr
pub const EVENT_PREFIX: &str = "__RP_EVENT__:";

/// Structured logging events emitted by the research pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineLog {
    /// Pipeline tasks spawned
    PipelineStarted {
        workers: usize,
        input_file: String,
        output_dir: String,
    },
    /// Pipeline finished (after cancellation or a fatal task error)
    PipelineStopped {
        reason: String,
    },
    /// Poll cycle started
    PollStarted {
        cycle: u64,
    },
    /// Poll cycle finished handing off topics
    PollCompleted {
        cycle: u64,
        found: usize,
        enqueued: usize,
        skipped: usize,
    },
    /// Poll cycle could not read the input file
    PollFailed {
        cycle: u64,
        error: String,
    },
    /// Topic accepted by a worker
    TopicEnqueued {
        cycle: u64,
        topic: String,
    },
    /// Worker started a research attempt
    ResearchStarted {
        worker_id: usize,
        topic: String,
        attempt: u32,
    },
    /// Research call returned content
    ResearchCompleted {
        worker_id: usize,
        topic: String,
        took_ms: u64,
    },
    /// Research attempt failed
    ResearchFailed {
        worker_id: usize,
        topic: String,
        attempt: u32,
        error: String,
        will_retry: bool,
    },
    /// Topic recorded as processed
    TopicProcessed {
        worker_id: usize,
        topic: String,
    },
    /// Result appended to its output file
    ResultWritten {
        topic: String,
        file_path: String,
    },
    /// A pipeline task exited with an error
    TaskFailed {
        task: String,
        error: String,
    },
}

impl PipelineLog {
    /// Emit this log event to stderr for machine parsing
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("{}{}", EVENT_PREFIX, json);
            // Force flush stderr in async/concurrent contexts
            let _ = std::io::stderr().flush();
        }
    }
}

#[macro_export]
macro_rules! log_pipeline_start {
    ($workers:expr, $input:expr, $output:expr) => {
        $crate::PipelineLog::PipelineStarted {
            workers: $workers,
            input_file: $input.to_string(),
            output_dir: $output.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_pipeline_stopped {
    ($reason:expr) => {
        $crate::PipelineLog::PipelineStopped {
            reason: $reason.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_poll_start {
    ($cycle:expr) => {
        $crate::PipelineLog::PollStarted { cycle: $cycle }.emit();
    };
}

#[macro_export]
macro_rules! log_poll_complete {
    ($cycle:expr, $found:expr, $enqueued:expr, $skipped:expr) => {
        $crate::PipelineLog::PollCompleted {
            cycle: $cycle,
            found: $found,
            enqueued: $enqueued,
            skipped: $skipped,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_poll_failed {
    ($cycle:expr, $error:expr) => {
        $crate::PipelineLog::PollFailed {
            cycle: $cycle,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_topic_enqueued {
    ($cycle:expr, $topic:expr) => {
        $crate::PipelineLog::TopicEnqueued {
            cycle: $cycle,
            topic: $topic.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_research_start {
    ($worker_id:expr, $topic:expr, $attempt:expr) => {
        $crate::PipelineLog::ResearchStarted {
            worker_id: $worker_id,
            topic: $topic.to_string(),
            attempt: $attempt,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_research_complete {
    ($worker_id:expr, $topic:expr, $took_ms:expr) => {
        $crate::PipelineLog::ResearchCompleted {
            worker_id: $worker_id,
            topic: $topic.to_string(),
            took_ms: $took_ms,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_research_failed {
    ($worker_id:expr, $topic:expr, $attempt:expr, $error:expr, $will_retry:expr) => {
        $crate::PipelineLog::ResearchFailed {
            worker_id: $worker_id,
            topic: $topic.to_string(),
            attempt: $attempt,
            error: $error.to_string(),
            will_retry: $will_retry,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_topic_processed {
    ($worker_id:expr, $topic:expr) => {
        $crate::PipelineLog::TopicProcessed {
            worker_id: $worker_id,
            topic: $topic.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_result_written {
    ($topic:expr, $path:expr) => {
        $crate::PipelineLog::ResultWritten {
            topic: $topic.to_string(),
            file_path: $path.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_task_failed {
    ($task:expr, $error:expr) => {
        $crate::PipelineLog::TaskFailed {
            task: $task.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Colored, human-readable lines on stdout, complementing the structured
// PipelineLog events on stderr.
// ============================================================================

/// Logs an informational message.
///
/// # Example
/// ```
/// use research_pipeline_sdk::log_info;
/// log_info!("Polling topics.txt every 5s");
/// ```
///
/// Outputs:
/// ```text
/// ℹ Polling topics.txt every 5s
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use research_pipeline_sdk::log_warning;
/// log_warning!("Input file unreadable, skipping cycle");
/// ```
///
/// Outputs:
/// ```text
/// ⚠ Warning: Input file unreadable, skipping cycle
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs that a file has been written.
///
/// # Example
/// ```
/// use research_pipeline_sdk::log_file_saved;
/// log_file_saved!("output/ocean_currents.json");
/// ```
///
/// Outputs:
/// ```text
/// ✓ Saved: output/ocean_currents.json
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

// ============================================================================
// End of Console Logging Macros
// ============================================================================
