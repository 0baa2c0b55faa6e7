//! Run summary with JSON persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;
use crate::step::{StepOutcome, StepRecord};

/// Final state of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// One record per invoked step, in execution order
    pub records: Vec<StepRecord>,
    /// Steps dropped unrun after a halting failure
    pub skipped: usize,
    /// True if the continuation policy stopped the run early
    pub halted: bool,
}

impl RunSummary {
    /// Steps with a passing verdict, including fully passing assertion steps.
    pub fn passed(&self) -> usize {
        self.count(|o| match o {
            StepOutcome::Passed { .. } => true,
            StepOutcome::Checked { failures } => *failures == 0,
            _ => false,
        })
    }

    /// Steps that reported a failure themselves.
    pub fn failed(&self) -> usize {
        self.count(|o| match o {
            StepOutcome::Failed { .. } => true,
            StepOutcome::Checked { failures } => *failures > 0,
            _ => false,
        })
    }

    /// Steps whose backoff budget ran out.
    pub fn timed_out(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::TimedOut { .. }))
    }

    /// Steps cut off by the runner's step timeout.
    pub fn stalled(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Stalled { .. }))
    }

    /// True when no invoked step counts as a failure.
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| !r.outcome.is_failure())
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Writes the summary as pretty JSON, creating parent directories.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Reads a summary written by [`write_json`](Self::write_json).
    pub async fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}
