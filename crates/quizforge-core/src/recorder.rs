//! Built-in attempt recorders.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use async_trait::async_trait;

use crate::report::AttemptOutcome;
use crate::traits::AttemptRecorder;

/// Keeps every recorded outcome in memory. Useful in tests and for
/// embedding callers that read results back synchronously.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    call_count: AtomicU32,
    outcomes: Mutex<Vec<AttemptOutcome>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `record` was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn outcomes(&self) -> Vec<AttemptOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<AttemptOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl AttemptRecorder for MemoryRecorder {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, outcome: &AttemptOutcome) -> anyhow::Result<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome.clone());
        Ok(())
    }
}

/// Writes each outcome as a JSON file into a directory.
#[derive(Debug, Clone)]
pub struct JsonDirRecorder {
    dir: PathBuf,
}

impl JsonDirRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl AttemptRecorder for JsonDirRecorder {
    fn name(&self) -> &str {
        "json"
    }

    async fn record(&self, outcome: &AttemptOutcome) -> anyhow::Result<()> {
        let path = self.dir.join(outcome.file_name());
        let json =
            serde_json::to_string_pretty(outcome).context("failed to serialize attempt")?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write attempt to {}", path.display()))?;
        tracing::debug!(path = %path.display(), "attempt recorded");
        Ok(())
    }
}
