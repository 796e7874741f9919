use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ArchiveError;
use crate::record::{RunRecord, RunSummary};

use super::{sort_summaries, validate_run_id, ArchiveStore};

/// In-process archive with the same write-once rules as the on-disk one.
#[derive(Default)]
pub struct MemoryArchiveStore {
    runs: RwLock<HashMap<String, RunRecord>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn persist(&self, record: &RunRecord) -> Result<(), ArchiveError> {
        validate_run_id(&record.run_id)?;
        let mut runs = self.runs.write().await;
        if runs.contains_key(&record.run_id) {
            return Err(ArchiveError::AlreadyExists(record.run_id.clone()));
        }
        runs.insert(record.run_id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RunSummary>, ArchiveError> {
        let mut summaries: Vec<RunSummary> =
            self.runs.read().await.values().map(RunRecord::summary).collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn get(&self, run_id: &str) -> Result<RunRecord, ArchiveError> {
        validate_run_id(run_id)?;
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(run_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_write_once_and_sorted_listing() {
        let store = MemoryArchiveStore::new();
        let now = Utc::now();

        let mut later = RunRecord::new("run-b", "m");
        later.started_at = now;
        let mut earlier = RunRecord::new("run-a", "m");
        earlier.started_at = now - Duration::minutes(5);

        store.persist(&later).await.unwrap();
        store.persist(&earlier).await.unwrap();
        assert!(matches!(
            store.persist(&later).await,
            Err(ArchiveError::AlreadyExists(id)) if id == "run-b"
        ));

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.run_id)
            .collect();
        assert_eq!(ids, vec!["run-a", "run-b"]);
        assert_eq!(store.get("run-b").await.unwrap(), later);
        assert!(matches!(
            store.get("missing").await,
            Err(ArchiveError::NotFound(_))
        ));
    }
}
