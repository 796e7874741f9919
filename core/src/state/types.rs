//! Run phase, progress snapshot and lifecycle event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RunVerdict;

/// Orchestrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Collecting,
    Analyzing,
    Archiving,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Analyzing => "analyzing",
            Self::Archiving => "archiving",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic counters for one stage of the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageProgress {
    pub completed: usize,
    pub total: usize,
    pub failures: usize,
}

/// Point-in-time view of the active (or last) run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: Option<String>,
    pub phase: RunPhase,
    pub collection: StageProgress,
    pub analysis: StageProgress,
    pub cancelled: bool,
}

impl ProgressSnapshot {
    /// `(stage, completed, total, failures)` for whichever stage is currently moving.
    pub fn active(&self) -> (RunPhase, usize, usize, usize) {
        let s = match self.phase {
            RunPhase::Collecting => self.collection,
            _ => self.analysis,
        };
        (self.phase, s.completed, s.total, s.failures)
    }
}

/// Lifecycle events broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    PhaseChanged {
        run_id: String,
        from: RunPhase,
        to: RunPhase,
        timestamp: DateTime<Utc>,
    },
    DeviceCaptured {
        run_id: String,
        index: usize,
        device_id: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },
    DeviceAnalyzed {
        run_id: String,
        index: usize,
        device_id: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },
    RunFinished {
        run_id: String,
        verdict: RunVerdict,
        partial: bool,
        timestamp: DateTime<Utc>,
    },
}
