//! Common test utilities for pipeline tests

use research_pipeline::pipeline_utils::RetryPolicy;
use research_pipeline::research::{
    Generator, Pipeline, PipelineConfig, ProcessedTopics, ResearchResult, Result,
};
use research_pipeline_sdk::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TEST_PROMPT: &str = "Research this topic: ";

/// Generator answering from a script keyed by topic
///
/// Unscripted topics succeed immediately with `research on <topic>`.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, topic: &str, content: &str) -> Self {
        self.replies.insert(topic.to_string(), content.to_string());
        self
    }

    pub fn delay(mut self, topic: &str, delay: Duration) -> Self {
        self.delays.insert(topic.to_string(), delay);
        self
    }

    pub fn fail(mut self, topic: &str) -> Self {
        self.failing.insert(topic.to_string());
        self
    }

    /// Number of generator calls made for `topic`
    pub fn calls(&self, topic: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(topic)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let topic = prompt
            .strip_prefix(TEST_PROMPT)
            .unwrap_or(prompt)
            .to_string();
        *self.calls.lock().unwrap().entry(topic.clone()).or_default() += 1;

        if let Some(delay) = self.delays.get(&topic) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&topic) {
            anyhow::bail!("scripted failure for {}", topic);
        }
        Ok(self
            .replies
            .get(&topic)
            .cloned()
            .unwrap_or_else(|| format!("research on {}", topic)))
    }
}

/// Temporary workspace holding the topic list and output directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn input_file(&self) -> PathBuf {
        self.dir.path().join("topics.txt")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    pub fn write_topics(&self, content: &str) {
        std::fs::write(self.input_file(), content).unwrap();
    }

    /// Fast-polling config over this workspace
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            input_file: self.input_file(),
            output_dir: self.output_dir(),
            workers: 3,
            poll_interval: Duration::from_millis(25),
            prompt: TEST_PROMPT.to_string(),
            retry: RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
            },
            ..Default::default()
        }
    }
}

/// A pipeline running on its own task
pub struct RunningPipeline {
    pub processed: Arc<dyn ProcessedTopics>,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<Result<()>>,
}

impl RunningPipeline {
    pub fn start(config: PipelineConfig, generator: Arc<ScriptedGenerator>) -> Self {
        let pipeline = Pipeline::new(config, generator).unwrap();
        let processed = pipeline.processed();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pipeline.run(cancel.clone()));
        Self {
            processed,
            cancel,
            handle,
        }
    }

    /// Cancel and wait for the pipeline to drain
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the pipeline to end on its own
    pub async fn join(self) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("pipeline did not stop")
            .expect("pipeline task panicked")
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Every record appended to `path`
pub fn read_records(path: &Path) -> Vec<ResearchResult> {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::Deserializer::from_str(&content)
        .into_iter::<ResearchResult>()
        .map(|record| record.unwrap())
        .collect()
}
