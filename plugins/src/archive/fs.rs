use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use netsentinel_core::archive::{sort_summaries, validate_run_id, ArchiveStore};
use netsentinel_core::error::ArchiveError;
use netsentinel_core::record::{RunRecord, RunSummary};

const RECORD_FILE: &str = "record.json";
const SUMMARY_FILE: &str = "summary.json";
const REPORT_FILE: &str = "report.md";

/// One directory per run under `root`, staged in a hidden directory and renamed into place.
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a run is (or would be) archived under.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    async fn write_run(&self, dir: &Path, record: &RunRecord) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(dir.join("captures")).await?;
        tokio::fs::create_dir_all(dir.join("analyses")).await?;

        tokio::fs::write(dir.join(RECORD_FILE), serde_json::to_vec_pretty(record)?).await?;
        tokio::fs::write(
            dir.join(SUMMARY_FILE),
            serde_json::to_vec_pretty(&record.summary())?,
        )
        .await?;
        tokio::fs::write(dir.join(REPORT_FILE), record.composite_report.as_bytes()).await?;

        for (index, result) in record.device_results.iter().enumerate() {
            let stem = format!("{:03}-{}", index + 1, file_stem(&result.device.id));

            let capture = match &result.capture.error {
                Some(err) => format!("[capture failed] {err}\n"),
                None => result.capture.raw_text.clone(),
            };
            tokio::fs::write(dir.join("captures").join(format!("{stem}.txt")), capture).await?;

            let analysis = match &result.analysis.error {
                Some(err) => format!("**FAILED**: {err}\n"),
                None => result.analysis.report_text.clone(),
            };
            tokio::fs::write(dir.join("analyses").join(format!("{stem}.md")), analysis).await?;
        }
        Ok(())
    }
}

/// Device ids come from the inventory; keep file names portable.
fn file_stem(device_id: &str) -> String {
    device_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ArchiveStore for FsArchiveStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn persist(&self, record: &RunRecord) -> Result<(), ArchiveError> {
        validate_run_id(&record.run_id)?;
        let target = self.run_dir(&record.run_id);
        if tokio::fs::try_exists(&target).await? {
            return Err(ArchiveError::AlreadyExists(record.run_id.clone()));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let staging = self
            .root
            .join(format!(".tmp-{}-{}", record.run_id, uuid::Uuid::new_v4().simple()));

        let staged = match self.write_run(&staging, record).await {
            Ok(()) => tokio::fs::rename(&staging, &target).await.map_err(|e| {
                if target.exists() {
                    ArchiveError::AlreadyExists(record.run_id.clone())
                } else {
                    ArchiveError::Io(e)
                }
            }),
            Err(e) => Err(e),
        };
        if let Err(err) = staged {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(err);
        }

        tracing::debug!(
            target: "netsentinel.archive",
            run_id = %record.run_id,
            dir = %target.display(),
            "run archived"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RunSummary>, ArchiveError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || !entry.file_type().await?.is_dir() {
                continue;
            }

            let path = entry.path().join(SUMMARY_FILE);
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(ArchiveError::from)
                .and_then(|bytes| serde_json::from_slice::<RunSummary>(&bytes).map_err(Into::into));
            match parsed {
                Ok(summary) => summaries.push(summary),
                Err(err) => tracing::warn!(
                    target: "netsentinel.archive",
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable run summary"
                ),
            }
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn get(&self, run_id: &str) -> Result<RunRecord, ArchiveError> {
        validate_run_id(run_id)?;
        let path = self.run_dir(run_id).join(RECORD_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArchiveError::NotFound(run_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}
