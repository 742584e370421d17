//! Topic source: polls the input file and hands new topics to the workers

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use research_pipeline_sdk::{
    log_poll_complete, log_poll_failed, log_poll_start, log_topic_enqueued, log_warning,
};

use crate::pipeline_utils::HandoffSender;
use crate::research::error::{PipelineError, Result};
use crate::research::processed::{PendingTopics, ProcessedTopics};
use crate::research::types::{PollSummary, Topic};

/// What to do when the input file cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PollErrorPolicy {
    /// Stop the pipeline
    #[default]
    Abort,
    /// Log the failure and try again next cycle
    Continue,
}

/// Split file content into topics: one per line, trimmed, blanks dropped
pub fn parse_topics(content: &str) -> Vec<Topic> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse the whole topic list
pub async fn read_topics(path: &Path) -> Result<Vec<Topic>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| PipelineError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_topics(&content))
}

/// Periodic poller feeding the work queue
pub struct TopicSource {
    input_file: PathBuf,
    interval: Duration,
    on_error: PollErrorPolicy,
    processed: Arc<dyn ProcessedTopics>,
    pending: Arc<PendingTopics>,
    queue: HandoffSender<Topic>,
    cancel: CancellationToken,
}

impl TopicSource {
    pub fn new(
        input_file: impl Into<PathBuf>,
        interval: Duration,
        processed: Arc<dyn ProcessedTopics>,
        pending: Arc<PendingTopics>,
        queue: HandoffSender<Topic>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            interval,
            on_error: PollErrorPolicy::default(),
            processed,
            pending,
            queue,
            cancel,
        }
    }

    pub fn with_error_policy(mut self, policy: PollErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Run one poll cycle
    ///
    /// Every topic not yet processed or pending is claimed and handed to a
    /// worker; each handoff waits until a worker accepts it. Returns early
    /// (with the counts so far) if cancelled while waiting.
    pub async fn poll_once(&self, cycle: u64) -> Result<PollSummary> {
        log_poll_start!(cycle);
        let topics = read_topics(&self.input_file).await?;

        let mut summary = PollSummary {
            cycle,
            found: topics.len(),
            ..PollSummary::default()
        };

        for topic in topics {
            // Claim before checking: workers record a topic before releasing it
            if !self.pending.try_claim(&topic) {
                debug!(cycle, topic = %topic, "Skipping topic still being researched");
                summary.skipped_pending += 1;
                continue;
            }
            if self.processed.contains(&topic) {
                self.pending.release(&topic);
                debug!(cycle, topic = %topic, "Skipping previously processed topic");
                summary.skipped_processed += 1;
                continue;
            }

            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                sent = self.queue.send(topic.clone()) => Some(sent),
            };
            match sent {
                Some(Ok(())) => {
                    log_topic_enqueued!(cycle, &topic);
                    summary.enqueued += 1;
                }
                Some(Err(_)) => {
                    self.pending.release(&topic);
                    return Err(PipelineError::QueueClosed("work"));
                }
                None => {
                    self.pending.release(&topic);
                    break;
                }
            }
        }

        log_poll_complete!(cycle, summary.found, summary.enqueued, summary.skipped());
        Ok(summary)
    }

    /// Poll on a fixed interval until cancelled
    ///
    /// The first cycle runs immediately. A cycle whose handoffs outlast the
    /// interval delays the next tick rather than bunching ticks up.
    pub async fn run(self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            cycle += 1;

            match self.poll_once(cycle).await {
                Ok(summary) => {
                    debug!(?summary, "Finished reading {}", self.input_file.display());
                }
                Err(e) if e.is_input_error() && self.on_error == PollErrorPolicy::Continue => {
                    log_poll_failed!(cycle, &e);
                    log_warning!("{}; retrying next cycle", e);
                }
                Err(e) => {
                    log_poll_failed!(cycle, &e);
                    return Err(e);
                }
            }
        }
    }
}
