use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inventory::DeviceSpec;

use super::capture::{AnalysisResult, RawCaptureResult};

/// Lifecycle of a run record.
///
/// A run-level fatal condition never yields a record: the run ends in
/// [`RunPhase::Failed`](crate::state::RunPhase::Failed) with a `RunError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    /// Terminal; reached even when individual devices failed.
    Completed,
}

/// Overall outcome shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunVerdict {
    Success,
    Partial,
    Failed,
}

impl RunVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Device identity without credentials; this is what gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl From<&DeviceSpec> for DeviceRef {
    fn from(spec: &DeviceSpec) -> Self {
        Self {
            id: spec.id.clone(),
            host: spec.host.clone(),
            port: spec.port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResult {
    pub device: DeviceRef,
    pub capture: RawCaptureResult,
    pub analysis: AnalysisResult,
}

impl DeviceResult {
    pub fn is_success(&self) -> bool {
        self.capture.is_success() && self.analysis.is_success()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub status: RunStatus,
    pub model: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when cancellation or the run deadline stopped dispatching new work.
    #[serde(default)]
    pub partial: bool,
    /// Inventory order.
    pub device_results: Vec<DeviceResult>,
    #[serde(default)]
    pub composite_report: String,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunStatus::Pending,
            model: model.into(),
            started_at: Utc::now(),
            finished_at: None,
            partial: false,
            device_results: Vec::new(),
            composite_report: String::new(),
        }
    }

    /// Pending → Running; resets `started_at`.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Utc::now();
    }

    /// Running → Completed with results in inventory order.
    pub fn finish(&mut self, device_results: Vec<DeviceResult>, partial: bool) {
        self.device_results = device_results;
        self.partial = partial;
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn success_count(&self) -> usize {
        self.device_results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.device_results.len() - self.success_count()
    }

    /// Failed when no device succeeded, Success when all did and the run was not
    /// cancelled, Partial otherwise.
    pub fn verdict(&self) -> RunVerdict {
        let ok = self.success_count();
        if ok == 0 {
            RunVerdict::Failed
        } else if ok == self.device_results.len() && !self.partial {
            RunVerdict::Success
        } else {
            RunVerdict::Partial
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            model: self.model.clone(),
            device_count: self.device_results.len(),
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            partial: self.partial,
            verdict: self.verdict(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub model: String,
    pub device_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub partial: bool,
    pub verdict: RunVerdict,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;

    fn result(id: &str, ok: bool) -> DeviceResult {
        let capture = if ok {
            RawCaptureResult::success(id, "output".to_string())
        } else {
            RawCaptureResult::failed(id, DeviceError::Connection("refused".to_string()))
        };
        let analysis = if ok {
            AnalysisResult::success(id, "all good".to_string(), 1)
        } else {
            AnalysisResult::mirror_capture(&capture)
        };
        DeviceResult {
            device: DeviceRef {
                id: id.to_string(),
                host: format!("{id}.lab"),
                port: 22,
            },
            capture,
            analysis,
        }
    }

    #[test]
    fn test_verdicts() {
        let mut record = RunRecord::new("r1", "qwen2");
        record.finish(vec![result("a", true), result("b", true)], false);
        assert_eq!(record.verdict(), RunVerdict::Success);

        let mut record = RunRecord::new("r2", "qwen2");
        record.finish(vec![result("a", true), result("b", false)], false);
        assert_eq!(record.verdict(), RunVerdict::Partial);
        assert_eq!(record.summary().failure_count, 1);

        let mut record = RunRecord::new("r3", "qwen2");
        record.finish(vec![result("a", true)], true);
        assert_eq!(record.verdict(), RunVerdict::Partial);

        let mut record = RunRecord::new("r4", "qwen2");
        record.finish(vec![result("a", false)], false);
        assert_eq!(record.verdict(), RunVerdict::Failed);
    }

    #[test]
    fn test_finish_is_terminal_completed() {
        let mut record = RunRecord::new("r1", "llama3");
        assert_eq!(record.status, RunStatus::Pending);
        record.start();
        assert_eq!(record.status, RunStatus::Running);
        record.finish(vec![result("a", false)], false);
        assert_eq!(record.status, RunStatus::Completed);
        assert!(record.finished_at.is_some());
    }
}
