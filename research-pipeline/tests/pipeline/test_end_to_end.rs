//! End-to-end runs: new topics become result files exactly once

use super::common::*;
use research_pipeline::research::writer::output_path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_new_topic_is_researched_and_written() {
    let ws = Workspace::new();
    ws.write_topics("ocean currents\n");
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply("ocean currents", "summary text")
            .delay("ocean currents", Duration::from_millis(50)),
    );

    let running = RunningPipeline::start(ws.config(), generator.clone());
    let processed = running.processed.clone();
    wait_for("ocean currents to be processed", || {
        processed.contains("ocean currents")
    })
    .await;
    running.stop().await.unwrap();

    let path = ws.output_dir().join("ocean_currents.json");
    let records = read_records(&path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "summary text");
    assert_eq!(records[0].topic, "ocean currents");
    assert!(records[0].worker_id < 3);
    assert!(records[0].took >= Duration::from_millis(50));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in ["Content", "Date", "Took", "Topic", "WorkerId"] {
        assert!(raw.get(key).is_some(), "missing key {}", key);
    }
}

#[tokio::test]
async fn test_topic_is_researched_once_across_cycles() {
    let ws = Workspace::new();
    // Duplicate line in the same cycle as well
    ws.write_topics("alpha\nalpha\n");
    let generator = Arc::new(ScriptedGenerator::new());

    let running = RunningPipeline::start(ws.config(), generator.clone());
    let processed = running.processed.clone();
    wait_for("alpha to be processed", || processed.contains("alpha")).await;

    // Several more poll cycles over the same file
    tokio::time::sleep(Duration::from_millis(200)).await;
    running.stop().await.unwrap();

    assert_eq!(generator.calls("alpha"), 1);
    assert_eq!(read_records(&output_path(&ws.output_dir(), "alpha")).len(), 1);
}

#[tokio::test]
async fn test_topics_appended_later_are_picked_up() {
    let ws = Workspace::new();
    ws.write_topics("alpha\n");
    let generator = Arc::new(ScriptedGenerator::new());

    let running = RunningPipeline::start(ws.config(), generator.clone());
    let processed = running.processed.clone();
    wait_for("alpha to be processed", || processed.contains("alpha")).await;

    ws.write_topics("alpha\nbeta gamma\n");
    wait_for("beta gamma to be processed", || {
        processed.contains("beta gamma")
    })
    .await;
    running.stop().await.unwrap();

    assert_eq!(generator.calls("alpha"), 1);
    assert_eq!(generator.calls("beta gamma"), 1);
    assert!(ws.output_dir().join("beta_gamma.json").exists());
}

#[tokio::test]
async fn test_many_topics_spread_over_workers() {
    let ws = Workspace::new();
    let topics: Vec<String> = (0..9).map(|i| format!("topic {}", i)).collect();
    ws.write_topics(&topics.join("\n"));
    let mut generator = ScriptedGenerator::new();
    for topic in &topics {
        generator = generator.delay(topic, Duration::from_millis(30));
    }
    let generator = Arc::new(generator);

    let running = RunningPipeline::start(ws.config(), generator.clone());
    let processed = running.processed.clone();
    wait_for("all topics to be processed", || processed.len() == 9).await;
    running.stop().await.unwrap();

    for topic in &topics {
        assert_eq!(generator.calls(topic), 1, "{} researched twice", topic);
        let records = read_records(&output_path(&ws.output_dir(), topic));
        assert_eq!(records.len(), 1);
        assert!(records[0].worker_id < 3);
    }
}

#[tokio::test]
async fn test_empty_input_file_produces_nothing() {
    let ws = Workspace::new();
    ws.write_topics("");
    let generator = Arc::new(ScriptedGenerator::new());

    let running = RunningPipeline::start(ws.config(), generator.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let processed = running.processed.clone();
    running.stop().await.unwrap();

    assert!(processed.is_empty());
    let written = std::fs::read_dir(ws.output_dir())
        .map(|entries| entries.count())
        .unwrap_or_default();
    assert_eq!(written, 0);
}

#[tokio::test]
async fn test_state_file_survives_restart() {
    let ws = Workspace::new();
    let state_file = ws.dir.path().join("state").join("processed.txt");
    ws.write_topics("alpha\n");
    let mut config = ws.config();
    config.state_file = Some(state_file.clone());

    let first = Arc::new(ScriptedGenerator::new());
    let running = RunningPipeline::start(config.clone(), first.clone());
    let processed = running.processed.clone();
    wait_for("alpha to be processed", || processed.contains("alpha")).await;
    running.stop().await.unwrap();

    ws.write_topics("alpha\nbeta\n");
    let second = Arc::new(ScriptedGenerator::new());
    let running = RunningPipeline::start(config, second.clone());
    let processed = running.processed.clone();
    wait_for("beta to be processed", || processed.contains("beta")).await;
    running.stop().await.unwrap();

    assert_eq!(second.calls("alpha"), 0);
    assert_eq!(second.calls("beta"), 1);
    assert_eq!(read_records(&output_path(&ws.output_dir(), "alpha")).len(), 1);
}
