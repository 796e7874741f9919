use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use crate::analysis::{render_report, AnalysisPipeline};
use crate::archive::ArchiveStore;
use crate::collector::FleetCollector;
use crate::config::RunConfig;
use crate::error::{DeviceError, InventoryError, RunError};
use crate::executor::{CancelToken, StageContext};
use crate::inference::InferenceBackend;
use crate::inventory::{Inventory, InventorySource};
use crate::record::{AnalysisResult, DeviceRef, DeviceResult, RawCaptureResult, RunRecord};
use crate::session::SessionTransport;
use crate::state::{ProgressSnapshot, RunEvent, RunPhase, StateManager};

/// `<UTC yyyymmddThhmmssZ>-<8 hex>`; sorts chronologically.
pub fn new_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"), &suffix[..8])
}

/// Drives one run: inventory → collection → analysis → archive.
pub struct Orchestrator {
    transport: Arc<dyn SessionTransport>,
    backend: Arc<dyn InferenceBackend>,
    archive: Arc<dyn ArchiveStore>,
    state: StateManager,
    cancel: CancelToken,
    running: AtomicBool,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    /// One orchestrator serves one run at a time; a second concurrent `run` is rejected.
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        backend: Arc<dyn InferenceBackend>,
        archive: Arc<dyn ArchiveStore>,
    ) -> Self {
        Self {
            transport,
            backend,
            archive,
            state: StateManager::new(),
            cancel: CancelToken::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Watch channel carrying the latest snapshot; never blocks the run.
    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.state.watch()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }

    /// Phase changes and per-device completions as they happen.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.state.subscribe()
    }

    /// Stop dispatching new device work. In-flight work finishes or times out and the
    /// run is archived as partial.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::warn!("cancellation requested");
        }
        self.cancel.cancel();
        self.state.mark_cancelled();
    }

    #[tracing::instrument(
        name = "run",
        skip_all,
        fields(inventory = %source.describe(), model = %config.model)
    )]
    /// Load the inventory, collect, analyse, render and archive.
    ///
    /// Device faults end up in the record. Only an unusable inventory, an archive write
    /// failure or a concurrent run return `Err`; the run then ends in [`RunPhase::Failed`]
    /// and nothing is archived.
    pub async fn run(
        &self,
        source: &dyn InventorySource,
        config: &RunConfig,
    ) -> Result<RunRecord, RunError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RunError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        self.cancel.reset();
        let run_id = new_run_id();
        self.state.begin_run(&run_id, 0);

        let inventory = match load_inventory(source).await {
            Ok(inv) if inv.devices.is_empty() => return Err(self.fail(RunError::NoDevices)),
            Ok(inv) => inv,
            Err(e) => return Err(self.fail(e.into())),
        };
        let commands = inventory
            .commands
            .clone()
            .unwrap_or_else(|| config.commands.clone());
        if commands.is_empty() {
            return Err(self.fail(InventoryError::EmptyCommandSet.into()));
        }

        let devices = inventory.devices;
        let total = devices.len();
        self.state.begin_run(&run_id, total);

        let mut record = RunRecord::new(&run_id, &config.model);
        record.start();
        tracing::info!(
            run_id = %run_id,
            devices = total,
            commands = commands.len(),
            collect_concurrency = config.collector.concurrency,
            analyze_concurrency = config.analysis.concurrency,
            "run started"
        );

        let watchdog = config.deadline.map(|deadline| {
            let cancel = self.cancel.clone();
            let state = self.state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!(deadline_secs = deadline.as_secs(), "run deadline reached");
                cancel.cancel();
                state.mark_cancelled();
            })
        });

        let collector = FleetCollector::from_options(self.transport.clone(), &config.collector);
        let pipeline =
            AnalysisPipeline::from_options(self.backend.clone(), &config.model, &config.analysis);
        let ctx = StageContext::new(self.cancel.clone(), self.state.clone());

        self.state.transition(RunPhase::Collecting)?;

        let (tx, rx) = mpsc::channel(total);
        let collect = async {
            let captures = collector.collect(&devices, &commands, &ctx, Some(tx)).await;
            let moved = self.state.transition(RunPhase::Analyzing);
            (captures, moved)
        };
        let ((captures, moved), analyses) =
            tokio::join!(collect, pipeline.analyze_stream(rx, total, &ctx));

        if let Some(handle) = watchdog {
            handle.abort();
        }
        moved?;

        let partial = self.cancel.is_cancelled();
        let device_results: Vec<DeviceResult> = devices
            .iter()
            .zip(captures)
            .zip(analyses)
            .map(|((device, capture), analysis)| DeviceResult {
                device: DeviceRef::from(device),
                analysis: analysis.unwrap_or_else(|| undelivered(&capture)),
                capture,
            })
            .collect();

        self.state.transition(RunPhase::Archiving)?;
        record.finish(device_results, partial);
        record.composite_report = render_report(&record, &config.report);

        if let Err(e) = self.archive.persist(&record).await {
            return Err(self.fail(e.into()));
        }

        self.state.transition(RunPhase::Completed)?;
        let verdict = record.verdict();
        self.state.finish(verdict, partial);
        tracing::info!(
            run_id = %run_id,
            succeeded = record.success_count(),
            failed = record.failure_count(),
            partial,
            verdict = verdict.as_str(),
            "run finished"
        );

        Ok(record)
    }

    fn fail(&self, err: RunError) -> RunError {
        tracing::error!(error = %err, "run failed");
        if let Err(e) = self.state.transition(RunPhase::Failed) {
            tracing::error!(error = %e, "could not mark run as failed");
        }
        err
    }
}

async fn load_inventory(source: &dyn InventorySource) -> Result<Inventory, InventoryError> {
    let inventory = source.load().await?;
    inventory.validate()?;
    Ok(inventory)
}

fn undelivered(capture: &RawCaptureResult) -> AnalysisResult {
    if capture.is_success() {
        AnalysisResult::failed(&capture.device_id, DeviceError::Cancelled, 0)
    } else {
        AnalysisResult::mirror_capture(capture)
    }
}
