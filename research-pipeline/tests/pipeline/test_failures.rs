//! Failed research and failing stages

use super::common::*;
use research_pipeline::research::{PipelineError, PollErrorPolicy};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_failed_topic_is_retried_on_later_cycles() {
    let ws = Workspace::new();
    ws.write_topics("X\nY\n");
    let generator = Arc::new(ScriptedGenerator::new().fail("X"));

    let running = RunningPipeline::start(ws.config(), generator.clone());
    let processed = running.processed.clone();
    wait_for("X to be attempted twice", || generator.calls("X") >= 2).await;
    wait_for("Y to be processed", || processed.contains("Y")).await;
    running.stop().await.unwrap();

    assert!(!processed.contains("X"));
    assert!(!ws.output_dir().join("X.json").exists());
    assert_eq!(generator.calls("Y"), 1);
}

#[tokio::test]
async fn test_retry_attempts_within_one_claim() {
    let ws = Workspace::new();
    ws.write_topics("X\n");
    let mut config = ws.config();
    config.retry.max_attempts = 3;
    // One claim only: stop polling after the first cycle
    config.poll_interval = Duration::from_secs(60);
    let generator = Arc::new(ScriptedGenerator::new().fail("X"));

    let running = RunningPipeline::start(config, generator.clone());
    wait_for("three attempts", || generator.calls("X") == 3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let processed = running.processed.clone();
    running.stop().await.unwrap();

    assert_eq!(generator.calls("X"), 3);
    assert!(!processed.contains("X"));
}

#[tokio::test]
async fn test_missing_input_aborts_pipeline() {
    let ws = Workspace::new();
    let generator = Arc::new(ScriptedGenerator::new());

    let running = RunningPipeline::start(ws.config(), generator);
    let err = running.join().await.unwrap_err();

    assert!(matches!(err, PipelineError::InputRead { .. }));
}

#[tokio::test]
async fn test_missing_input_tolerated_with_continue_policy() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.on_poll_error = PollErrorPolicy::Continue;
    let generator = Arc::new(ScriptedGenerator::new());

    let running = RunningPipeline::start(config, generator.clone());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!running.handle.is_finished());

    ws.write_topics("late arrival\n");
    let processed = running.processed.clone();
    wait_for("late arrival to be processed", || {
        processed.contains("late arrival")
    })
    .await;
    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_unwritable_output_fails_pipeline() {
    let ws = Workspace::new();
    ws.write_topics("alpha\n");
    let blocker = ws.dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let mut config = ws.config();
    config.output_dir = blocker.join("output");
    let generator = Arc::new(ScriptedGenerator::new());

    let running = RunningPipeline::start(config, generator);
    let processed = running.processed.clone();
    let err = running.join().await.unwrap_err();

    assert!(matches!(err, PipelineError::OutputWrite { .. }));
    assert!(!processed.contains("alpha"));
}
