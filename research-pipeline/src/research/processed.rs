//! Shared record of processed and in-flight topics
//!
//! The poller reads these sets before every handoff and the workers write to
//! them after every completed topic. All access goes through a single
//! `std::sync::Mutex` per set, never held across an `.await`.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::research::error::{PipelineError, Result};

/// Append-only set of topics whose research result has been handed to the writer
pub trait ProcessedTopics: Send + Sync {
    /// Whether `topic` has already been processed
    fn contains(&self, topic: &str) -> bool;

    /// Record `topic` as processed
    fn append(&self, topic: &str) -> Result<()>;

    /// Number of recorded entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in append order
    fn snapshot(&self) -> Vec<String>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory processed set; forgotten when the process exits
#[derive(Debug, Default)]
pub struct InMemoryProcessedTopics {
    entries: Mutex<Vec<String>>,
}

impl InMemoryProcessedTopics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessedTopics for InMemoryProcessedTopics {
    fn contains(&self, topic: &str) -> bool {
        lock(&self.entries).iter().any(|t| t == topic)
    }

    fn append(&self, topic: &str) -> Result<()> {
        lock(&self.entries).push(topic.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    fn snapshot(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }
}

#[derive(Debug)]
struct Journal {
    entries: Vec<String>,
    file: File,
}

/// Processed set backed by a journal file, one topic per line
///
/// Survives restarts: entries found in the journal on open count as
/// processed.
#[derive(Debug)]
pub struct JournalProcessedTopics {
    path: PathBuf,
    journal: Mutex<Journal>,
}

impl JournalProcessedTopics {
    /// Load `path` (missing file means empty) and open it for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state_err = |source: io::Error| PipelineError::StateFile {
            path: path.clone(),
            source,
        };

        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(state_err(e)),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(state_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(state_err)?;

        Ok(Self {
            journal: Mutex::new(Journal { entries, file }),
            path,
        })
    }

}

impl ProcessedTopics for JournalProcessedTopics {
    fn contains(&self, topic: &str) -> bool {
        lock(&self.journal).entries.iter().any(|t| t == topic)
    }

    /// Appends and flushes synchronously under the lock; one short line per
    /// finished topic.
    fn append(&self, topic: &str) -> Result<()> {
        let mut journal = lock(&self.journal);
        writeln!(journal.file, "{}", topic)
            .and_then(|()| journal.file.flush())
            .map_err(|source| PipelineError::StateFile {
                path: self.path.clone(),
                source,
            })?;
        journal.entries.push(topic.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        lock(&self.journal).entries.len()
    }

    fn snapshot(&self) -> Vec<String> {
        lock(&self.journal).entries.clone()
    }
}

/// Topics handed to a worker whose research has not finished yet
///
/// Claimed by the poller right before the handoff and released by the
/// worker once the topic is processed or given up on, so a research call
/// that outlasts a poll cycle is never submitted twice.
#[derive(Debug, Default)]
pub struct PendingTopics {
    claims: Mutex<HashSet<String>>,
}

impl PendingTopics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `topic`; false if it is already claimed
    pub fn try_claim(&self, topic: &str) -> bool {
        lock(&self.claims).insert(topic.to_string())
    }

    pub fn release(&self, topic: &str) {
        lock(&self.claims).remove(topic);
    }

    pub fn contains(&self, topic: &str) -> bool {
        lock(&self.claims).contains(topic)
    }

    pub fn len(&self) -> usize {
        lock(&self.claims).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
