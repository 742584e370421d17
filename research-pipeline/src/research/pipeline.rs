//! Pipeline wiring and supervision
//!
//! Connects the stages and keeps them running:
//!
//! ```text
//! input file -> TopicSource -> [work handoff] -> Worker x N -> [result handoff] -> Writer -> files
//! ```
//!
//! Every stage runs as its own tokio task. The supervisor waits on all of
//! them; the first task to fail (or panic) cancels the rest, the remaining
//! tasks are drained and the error is returned.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use research_pipeline_sdk::{log_pipeline_start, log_pipeline_stopped, log_task_failed};

use crate::pipeline_utils::handoff;
use crate::research::config::PipelineConfig;
use crate::research::error::{PipelineError, Result};
use crate::research::generator::Generator;
use crate::research::processed::{
    InMemoryProcessedTopics, JournalProcessedTopics, PendingTopics, ProcessedTopics,
};
use crate::research::source::TopicSource;
use crate::research::types::PipelineTask;
use crate::research::worker::{panic_message, WorkerContext, WorkerPool};
use crate::research::writer::Writer;

/// Spawn a stage, turning a panic into `PipelineError::TaskPanicked`
pub(crate) fn spawn_stage<F>(
    tasks: &mut JoinSet<(PipelineTask, Result<()>)>,
    task: PipelineTask,
    stage: F,
) where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tasks.spawn(async move {
        let outcome = AssertUnwindSafe(stage)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(PipelineError::TaskPanicked {
                    task: task.to_string(),
                    message: panic_message(panic.as_ref()),
                })
            });
        (task, outcome)
    });
}

/// Processed set implied by `config`: a journal if `state_file` is set
pub fn open_processed_topics(config: &PipelineConfig) -> Result<Arc<dyn ProcessedTopics>> {
    Ok(match &config.state_file {
        Some(path) => Arc::new(JournalProcessedTopics::open(path)?),
        None => Arc::new(InMemoryProcessedTopics::new()),
    })
}

/// The assembled research pipeline
pub struct Pipeline {
    config: PipelineConfig,
    generator: Arc<dyn Generator>,
    processed: Arc<dyn ProcessedTopics>,
    pending: Arc<PendingTopics>,
}

impl Pipeline {
    /// Build a pipeline with the processed set implied by `config`
    pub fn new(config: PipelineConfig, generator: Arc<dyn Generator>) -> Result<Self> {
        config.validate()?;
        let processed = open_processed_topics(&config)?;
        Ok(Self::with_processed(config, generator, processed))
    }

    /// Build a pipeline around an existing processed set
    pub fn with_processed(
        config: PipelineConfig,
        generator: Arc<dyn Generator>,
        processed: Arc<dyn ProcessedTopics>,
    ) -> Self {
        Self {
            config,
            generator,
            processed,
            pending: Arc::new(PendingTopics::new()),
        }
    }

    /// Shared processed set, for inspection while running
    pub fn processed(&self) -> Arc<dyn ProcessedTopics> {
        Arc::clone(&self.processed)
    }

    /// Run every stage until `cancel` fires or a stage fails
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let config = &self.config;
        let (topics_tx, topics_rx) = handoff();
        let (results_tx, results_rx) = handoff();
        let mut tasks = JoinSet::new();

        let writer = Writer::new(&config.output_dir, results_rx);
        spawn_stage(&mut tasks, PipelineTask::Writer, writer.run());

        WorkerPool::new(
            config.workers,
            WorkerContext {
                topics: topics_rx,
                results: results_tx,
                generator: Arc::clone(&self.generator),
                processed: Arc::clone(&self.processed),
                pending: Arc::clone(&self.pending),
                prompt: Arc::from(config.prompt.as_str()),
                retry: config.retry.clone(),
                cancel: cancel.clone(),
            },
        )
        .spawn(&mut tasks);

        let source = TopicSource::new(
            &config.input_file,
            config.poll_interval,
            Arc::clone(&self.processed),
            Arc::clone(&self.pending),
            topics_tx,
            cancel.clone(),
        )
        .with_error_policy(config.on_poll_error);
        spawn_stage(&mut tasks, PipelineTask::Source, source.run());

        log_pipeline_start!(
            config.workers,
            config.input_file.display(),
            config.output_dir.display()
        );

        let mut first_error: Option<PipelineError> = None;
        while let Some(joined) = tasks.join_next().await {
            let (task, outcome) = match joined {
                Ok((task, outcome)) => (task.to_string(), outcome),
                // Stages catch their own panics; this is an aborted task
                Err(join_err) => (
                    "pipeline task".to_string(),
                    Err(PipelineError::TaskPanicked {
                        task: "pipeline task".to_string(),
                        message: join_err.to_string(),
                    }),
                ),
            };

            match outcome {
                Ok(()) => debug!(%task, "Task exited"),
                Err(e) => {
                    error!(%task, error = %e, "Task failed");
                    log_task_failed!(task, &e);
                    cancel.cancel();
                    // A closed queue is a consequence of another failure; keep the cause
                    let is_cause = |e: &PipelineError| !matches!(e, PipelineError::QueueClosed(_));
                    if first_error
                        .as_ref()
                        .map_or(true, |prev| !is_cause(prev) && is_cause(&e))
                    {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => {
                log_pipeline_stopped!(format!("failed: {}", e));
                Err(e)
            }
            None => {
                log_pipeline_stopped!("cancelled");
                Ok(())
            }
        }
    }
}
