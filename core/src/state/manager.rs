//! Progress and lifecycle state of the active run.

use super::transitions::{StateTransition, TransitionError};
use super::types::{ProgressSnapshot, RunEvent, RunPhase, StageProgress};
use crate::record::RunVerdict;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Publishes progress snapshots (`watch`) and lifecycle events (`broadcast`).
///
/// Writers never block on readers; slow event subscribers lose old events, snapshot
/// readers always see the latest state.
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<StateManagerInner>,
}

struct StateManagerInner {
    progress: watch::Sender<ProgressSnapshot>,
    event_tx: broadcast::Sender<RunEvent>,
}

impl StateManager {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        let (progress, _) = watch::channel(ProgressSnapshot::default());

        Self {
            inner: Arc::new(StateManagerInner { progress, event_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<ProgressSnapshot> {
        self.inner.progress.subscribe()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.progress.borrow().clone()
    }

    fn emit_event(&self, event: RunEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    fn run_id(&self) -> String {
        self.inner
            .progress
            .borrow()
            .run_id
            .clone()
            .unwrap_or_default()
    }

    /// Reset counters for a new run of `total` devices.
    pub fn begin_run(&self, run_id: &str, total: usize) {
        let stage = StageProgress {
            completed: 0,
            total,
            failures: 0,
        };
        self.inner.progress.send_replace(ProgressSnapshot {
            run_id: Some(run_id.to_string()),
            phase: RunPhase::Idle,
            collection: stage,
            analysis: stage,
            cancelled: false,
        });
    }

    /// Validate and apply a phase change; returns the previous phase.
    pub fn transition(&self, to: RunPhase) -> Result<RunPhase, TransitionError> {
        let mut outcome = Err(TransitionError::FromTerminalState {
            state: RunPhase::Failed,
        });
        self.inner.progress.send_if_modified(|snap| {
            match StateTransition::validate(snap.phase, to) {
                Ok(()) => {
                    outcome = Ok(snap.phase);
                    snap.phase = to;
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });

        let from = outcome?;
        tracing::info!(
            target: "netsentinel.state",
            from = from.as_str(),
            to = to.as_str(),
            "{}",
            StateTransition::phase_description(to)
        );
        self.emit_event(RunEvent::PhaseChanged {
            run_id: self.run_id(),
            from,
            to,
            timestamp: Utc::now(),
        });
        Ok(from)
    }

    /// Count one finished capture and broadcast it.
    pub fn record_capture(&self, index: usize, device_id: &str, success: bool) {
        self.inner.progress.send_modify(|snap| {
            snap.collection.completed += 1;
            if !success {
                snap.collection.failures += 1;
            }
        });
        self.emit_event(RunEvent::DeviceCaptured {
            run_id: self.run_id(),
            index,
            device_id: device_id.to_string(),
            success,
            timestamp: Utc::now(),
        });
    }

    /// Count one finished analysis and broadcast it.
    pub fn record_analysis(&self, index: usize, device_id: &str, success: bool) {
        self.inner.progress.send_modify(|snap| {
            snap.analysis.completed += 1;
            if !success {
                snap.analysis.failures += 1;
            }
        });
        self.emit_event(RunEvent::DeviceAnalyzed {
            run_id: self.run_id(),
            index,
            device_id: device_id.to_string(),
            success,
            timestamp: Utc::now(),
        });
    }

    pub fn mark_cancelled(&self) {
        self.inner.progress.send_if_modified(|snap| {
            let changed = !snap.cancelled;
            snap.cancelled = true;
            changed
        });
    }

    /// Publish the final verdict on the snapshot.
    pub fn finish(&self, verdict: RunVerdict, partial: bool) {
        self.emit_event(RunEvent::RunFinished {
            run_id: self.run_id(),
            verdict,
            partial,
            timestamp: Utc::now(),
        });
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_and_events() {
        let manager = StateManager::new();
        let mut events = manager.subscribe();
        let rx = manager.watch();

        manager.begin_run("r1", 2);
        manager.transition(RunPhase::Collecting).unwrap();
        manager.record_capture(0, "a", true);
        manager.record_capture(1, "b", false);

        let snap = rx.borrow().clone();
        assert_eq!(snap.collection.completed, 2);
        assert_eq!(snap.collection.failures, 1);
        assert_eq!(snap.collection.total, 2);
        assert_eq!(snap.phase, RunPhase::Collecting);

        match events.recv().await.unwrap() {
            RunEvent::PhaseChanged { run_id, from, to, .. } => {
                assert_eq!(run_id, "r1");
                assert_eq!(from, RunPhase::Idle);
                assert_eq!(to, RunPhase::Collecting);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_invalid_transition_leaves_phase() {
        let manager = StateManager::new();
        manager.begin_run("r1", 1);
        assert!(manager.transition(RunPhase::Archiving).is_err());
        assert_eq!(manager.snapshot().phase, RunPhase::Idle);
    }
}
