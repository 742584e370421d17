//! Single writer appending research results to per-topic JSON files

use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use research_pipeline_sdk::{log_file_saved, log_result_written};

use crate::pipeline_utils::HandoffReceiver;
use crate::research::error::{PipelineError, Result};
use crate::research::types::ResearchResult;

/// File name for `topic`: spaces (and path separators) become underscores
pub fn output_file_name(topic: &str) -> String {
    let stem: String = topic
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("{}.json", stem)
}

/// Full path of the result file for `topic`
pub fn output_path(output_dir: &Path, topic: &str) -> PathBuf {
    output_dir.join(output_file_name(topic))
}

/// Drains the result queue one result at a time
///
/// Only one writer exists, so files need no locking.
pub struct Writer {
    output_dir: PathBuf,
    results: HandoffReceiver<ResearchResult>,
}

impl Writer {
    pub fn new(output_dir: impl Into<PathBuf>, results: HandoffReceiver<ResearchResult>) -> Self {
        Self {
            output_dir: output_dir.into(),
            results,
        }
    }

    /// Create the output directory
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| PipelineError::OutputWrite {
                path: self.output_dir.clone(),
                source,
            })
    }

    /// Append one pretty-printed JSON object for `result` to its topic file
    pub async fn write(&self, result: &ResearchResult) -> Result<PathBuf> {
        let path = output_path(&self.output_dir, &result.topic);

        let mut record =
            serde_json::to_vec_pretty(result).map_err(|source| PipelineError::Encode {
                topic: result.topic.clone(),
                source,
            })?;
        record.push(b'\n');

        let io_err = |source: std::io::Error| PipelineError::OutputWrite {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(&record).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(path)
    }

    /// Write results until every worker has dropped its sender
    ///
    /// The first write failure ends the writer; the supervisor decides
    /// what happens to the rest of the pipeline.
    pub async fn run(self) -> Result<()> {
        self.prepare().await?;

        while let Some(result) = self.results.recv().await {
            let path = self.write(&result).await?;
            log_result_written!(&result.topic, path.display());
            log_file_saved!(path.display());
        }

        debug!("Result queue drained, writer stopped");
        Ok(())
    }
}
