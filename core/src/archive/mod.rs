//! Write-once run archive.

mod memory;

use async_trait::async_trait;

use crate::error::ArchiveError;
use crate::record::{RunRecord, RunSummary};

pub use memory::MemoryArchiveStore;

/// Persists finished runs keyed by run id. A run id is written at most once.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    fn name(&self) -> &str;

    /// Store a finished run; fails with `AlreadyExists` if the id is taken.
    async fn persist(&self, record: &RunRecord) -> Result<(), ArchiveError>;

    /// Summaries of every stored run, oldest first.
    async fn list(&self) -> Result<Vec<RunSummary>, ArchiveError>;

    async fn get(&self, run_id: &str) -> Result<RunRecord, ArchiveError>;
}

/// Run ids double as directory names: ASCII alphanumerics, `-` and `_` only.
pub fn validate_run_id(run_id: &str) -> Result<(), ArchiveError> {
    let ok = !run_id.is_empty()
        && run_id.len() <= 128
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ArchiveError::InvalidRunId(run_id.to_string()))
    }
}

/// Oldest first; ties broken by run id so listings are stable.
pub fn sort_summaries(summaries: &mut [RunSummary]) {
    summaries.sort_by(|a, b| {
        a.started_at
            .cmp(&b.started_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
}
