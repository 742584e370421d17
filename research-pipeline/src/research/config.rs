//! Pipeline configuration: defaults, YAML file, validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::pipeline_utils::{serde_duration, RetryPolicy};
use crate::research::error::PipelineError;
use crate::research::generator::DEFAULT_RESEARCH_PROMPT;
use crate::research::source::PollErrorPolicy;

pub const DEFAULT_INPUT_FILE: &str = "topics.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Configuration for the research pipeline
///
/// Every field has a default, so a YAML file only needs the values it
/// changes:
///
/// ```yaml
/// input_file: topics.txt
/// output_dir: output
/// workers: 3
/// poll_interval_ms: 5000
/// retry:
///   max_attempts: 3
///   base_delay_ms: 1000
/// on_poll_error: continue
/// state_file: state/processed.txt
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Topic list, re-read every poll cycle
    pub input_file: PathBuf,
    /// Directory receiving one `.json` file per topic
    pub output_dir: PathBuf,
    /// Number of concurrent research workers
    pub workers: usize,
    /// Delay between poll cycles
    #[serde(rename = "poll_interval_ms", with = "serde_duration::millis")]
    pub poll_interval: Duration,
    /// Prompt prefix placed before each topic (file path or literal text)
    pub prompt: String,
    /// Chat model name
    pub model: String,
    /// Base URL of the OpenAI-compatible API
    pub api_base: String,
    /// Per-request timeout for the research call (none by default)
    #[serde(rename = "request_timeout_ms", with = "serde_duration::millis_opt")]
    pub request_timeout: Option<Duration>,
    /// Retry policy for failed research calls
    pub retry: RetryPolicy,
    /// Reaction to an unreadable input file
    pub on_poll_error: PollErrorPolicy,
    /// Journal of processed topics kept across restarts
    pub state_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from(DEFAULT_INPUT_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            workers: DEFAULT_WORKERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            prompt: DEFAULT_RESEARCH_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: None,
            retry: RetryPolicy::default(),
            on_poll_error: PollErrorPolicy::default(),
            state_file: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document on top of the defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse pipeline config")
    }

    /// Load a YAML config file
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&yaml)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let invalid = |msg: &str| Err(PipelineError::InvalidConfig(msg.to_string()));

        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.poll_interval.is_zero() {
            return invalid("poll_interval_ms must be greater than 0");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.retry.base_delay > self.retry.max_delay {
            return invalid("retry.base_delay_ms must not exceed retry.max_delay_ms");
        }
        if self.prompt.trim().is_empty() {
            return invalid("prompt must not be empty");
        }
        Ok(())
    }

    /// Replace a prompt that names an existing file with the file's content
    pub async fn resolve_prompt(&mut self) -> Result<()> {
        self.prompt = load_prompt_file(&self.prompt).await?;
        Ok(())
    }
}

/// Load file content or return literal string
pub async fn load_prompt_file(value: &str) -> Result<String> {
    let path = Path::new(value);
    if path.exists() && path.is_file() {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt file: {}", value))
    } else {
        Ok(value.to_string())
    }
}
