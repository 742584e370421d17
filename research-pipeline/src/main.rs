/*
┌─────────────────────────────────────────────────────────────────────────────┐
│                          TOPIC RESEARCH PIPELINE                             │
└─────────────────────────────────────────────────────────────────────────────┘

  TOPIC SOURCE (every poll interval)
    │
    ├─> Re-read the topic list, one topic per line
    ├─> Skip topics already processed or still in flight
    └─> Hand each new topic to the next free worker

         ↓

  RESEARCH WORKERS (N concurrent)
    │
    ├─> Prompt prefix + topic -> chat completion
    ├─> Retry with backoff, then leave the topic for the next poll
    └─> Hand the result to the writer, mark the topic processed

         ↓

  WRITER (single)
    │
    └─> Append pretty JSON to <output_dir>/<topic_with_underscores>.json

  Ctrl-C stops polling, lets in-flight results reach the writer and exits.

EXAMPLE COMMANDS:

  # Defaults: topics.txt, ./output, 3 workers, 5s poll
  cargo run -- --input topics.txt

  # Config file plus overrides
  cargo run -- --config pipeline.yaml --workers 8 --model gpt-4o-mini

  # Keep the processed set across restarts
  cargo run -- --state-file state/processed.txt --on-poll-error continue

  Set OPENAI_API_KEY (or put it in .env) before running.
*/

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use research_pipeline::research::{cli::Args, OpenAiGenerator, Pipeline};
use research_pipeline_sdk::{log_info, log_warning};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.load_config().await?;

    let generator = OpenAiGenerator::from_env(
        config.api_base.clone(),
        config.model.clone(),
        config.request_timeout,
    )?;

    log_info!(
        "Watching {} with {} workers, results in {}",
        config.input_file.display(),
        config.workers,
        config.output_dir.display()
    );

    let pipeline = Pipeline::new(config, Arc::new(generator))?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warning!("Shutting down, waiting for in-flight topics");
            shutdown.cancel();
        }
    });

    pipeline.run(cancel).await?;
    log_info!("Pipeline stopped");
    Ok(())
}
