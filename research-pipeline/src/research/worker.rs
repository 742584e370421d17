//! Research workers: take topics, call the generator, hand results to the writer

use chrono::Local;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use research_pipeline_sdk::{
    log_research_complete, log_research_failed, log_research_start, log_topic_processed,
};

use crate::pipeline_utils::serde_duration::saturating_millis;
use crate::pipeline_utils::{HandoffReceiver, HandoffSender, RetryPolicy};
use crate::research::error::{PipelineError, Result};
use crate::research::generator::{research_prompt, Generator};
use crate::research::pipeline::spawn_stage;
use crate::research::processed::{PendingTopics, ProcessedTopics};
use crate::research::types::{PipelineTask, ResearchResult, Topic, WorkerId};

/// Everything a worker shares with its siblings
#[derive(Clone)]
pub struct WorkerContext {
    pub topics: HandoffReceiver<Topic>,
    pub results: HandoffSender<ResearchResult>,
    pub generator: Arc<dyn Generator>,
    pub processed: Arc<dyn ProcessedTopics>,
    pub pending: Arc<PendingTopics>,
    /// Prompt prefix; the topic is appended to it
    pub prompt: Arc<str>,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
}

/// Fixed-size pool of identical workers
pub struct WorkerPool {
    size: usize,
    ctx: WorkerContext,
}

impl WorkerPool {
    pub fn new(size: usize, ctx: WorkerContext) -> Self {
        Self { size, ctx }
    }

    /// Spawn every worker onto `tasks`, ids `0..size`
    pub fn spawn(self, tasks: &mut JoinSet<(PipelineTask, Result<()>)>) {
        for id in 0..self.size {
            let worker = Worker::new(id, self.ctx.clone());
            spawn_stage(tasks, PipelineTask::Worker(id), worker.run());
        }
    }
}

/// One research worker
pub struct Worker {
    id: WorkerId,
    ctx: WorkerContext,
}

impl Worker {
    pub fn new(id: WorkerId, ctx: WorkerContext) -> Self {
        Self { id, ctx }
    }

    /// Process topics one at a time until cancelled or the work queue closes
    ///
    /// A failed topic never stops the worker; only losing the writer does.
    pub async fn run(self) -> Result<()> {
        debug!(worker_id = self.id, "Worker started");
        loop {
            let topic = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => break,
                topic = self.ctx.topics.recv() => match topic {
                    Some(topic) => topic,
                    None => break,
                },
            };
            self.handle(topic).await?;
        }
        debug!(worker_id = self.id, "Worker stopped");
        Ok(())
    }

    async fn handle(&self, topic: Topic) -> Result<()> {
        let Some(result) = self.research(&topic).await else {
            // Not marked processed: the next poll cycle picks it up again
            self.ctx.pending.release(&topic);
            return Ok(());
        };

        if self.ctx.results.send(result).await.is_err() {
            self.ctx.pending.release(&topic);
            return Err(PipelineError::QueueClosed("result"));
        }

        // Processed before released, so the poller never sees a gap
        let recorded = self.ctx.processed.append(&topic);
        self.ctx.pending.release(&topic);
        recorded?;
        log_topic_processed!(self.id, &topic);
        Ok(())
    }

    /// Call the generator under the retry policy
    ///
    /// `None` once every attempt failed or the worker was cancelled.
    async fn research(&self, topic: &str) -> Option<ResearchResult> {
        let prompt = research_prompt(&self.ctx.prompt, topic);
        let retry = &self.ctx.retry;

        for attempt in 1..=retry.max_attempts.max(1) {
            log_research_start!(self.id, topic, attempt);
            let start = Instant::now();
            let call = AssertUnwindSafe(self.ctx.generator.generate(&prompt)).catch_unwind();

            let outcome = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => return None,
                outcome = call => outcome,
            };

            let error = match outcome {
                Ok(Ok(content)) => {
                    let took = start.elapsed();
                    log_research_complete!(self.id, topic, saturating_millis(took));
                    return Some(ResearchResult {
                        content,
                        generated_at: Local::now(),
                        took,
                        topic: topic.to_string(),
                        worker_id: self.id,
                    });
                }
                Ok(Err(e)) => format!("{:#}", e),
                Err(panic) => format!("generator panicked: {}", panic_message(panic.as_ref())),
            };

            let will_retry = retry.should_retry(attempt);
            log_research_failed!(self.id, topic, attempt, &error, will_retry);
            if !will_retry {
                break;
            }

            tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => return None,
                _ = tokio::time::sleep(retry.delay_after(attempt)) => {}
            }
        }
        None
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
