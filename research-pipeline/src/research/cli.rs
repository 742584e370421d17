//! CLI argument parsing for the research pipeline

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::research::config::PipelineConfig;
use crate::research::source::PollErrorPolicy;

/// Research Pipeline CLI Arguments
///
/// Flags override values from `--config`, which override the defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "research-pipeline",
    about = "Poll a topic list and research every new topic with a pool of workers"
)]
pub struct Args {
    /// YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Topic list, one topic per line (default: topics.txt)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for per-topic result files (default: output)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of concurrent research workers (default: 3)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Milliseconds between poll cycles (default: 5000)
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Prompt prefix (file path or string)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Chat model (default: gpt-4o)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    pub api_base: Option<String>,

    /// Per-request timeout for research calls in milliseconds
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Attempts per topic before giving up until the next poll (default: 3)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Backoff before the first retry in milliseconds (default: 1000)
    #[arg(long)]
    pub retry_base_delay_ms: Option<u64>,

    /// Backoff cap in milliseconds (default: 30000)
    #[arg(long)]
    pub retry_max_delay_ms: Option<u64>,

    /// Reaction to an unreadable topic list
    #[arg(long, value_enum)]
    pub on_poll_error: Option<PollErrorPolicy>,

    /// Journal of processed topics, kept across restarts
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

impl Args {
    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(input) = &self.input {
            config.input_file = input.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(ms) = self.request_timeout_ms {
            config.request_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(ms) = self.retry_base_delay_ms {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_max_delay_ms {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(policy) = self.on_poll_error {
            config.on_poll_error = policy;
        }
        if let Some(state_file) = &self.state_file {
            config.state_file = Some(state_file.clone());
        }
    }

    /// Build the final configuration: defaults, then `--config`, then flags
    pub async fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path).await?,
            None => PipelineConfig::default(),
        };
        self.apply(&mut config);
        config.resolve_prompt().await?;
        config.validate()?;
        Ok(config)
    }
}
