//! Cancellation and drain behavior

use super::common::*;
use research_pipeline::research::{Pipeline, PipelineConfig, PipelineError};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_cancel_idle_pipeline_returns_ok() {
    let ws = Workspace::new();
    ws.write_topics("");
    let running = RunningPipeline::start(ws.config(), Arc::new(ScriptedGenerator::new()));

    tokio::time::sleep(Duration::from_millis(40)).await;
    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_cancel_interrupts_slow_research() {
    let ws = Workspace::new();
    ws.write_topics("slow\n");
    let generator = Arc::new(ScriptedGenerator::new().delay("slow", Duration::from_secs(30)));

    let running = RunningPipeline::start(ws.config(), generator.clone());
    wait_for("slow to start", || generator.calls("slow") == 1).await;
    let processed = running.processed.clone();

    let started = Instant::now();
    running.stop().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!processed.contains("slow"));
    assert!(!ws.output_dir().join("slow.json").exists());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_start() {
    let config = PipelineConfig {
        workers: 0,
        ..Default::default()
    };
    let result = Pipeline::new(config, Arc::new(ScriptedGenerator::new()));

    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}
