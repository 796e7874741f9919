use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use netsentinel_core::state::{ProgressSnapshot, RunPhase};
use netsentinel_core::RunVerdict;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const BAR_TEMPLATE: &str =
    "{prefix:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} devices {msg}";

/// Two bars (collection, analysis) fed from the orchestrator's progress snapshots.
pub struct ProgressMonitor {
    _multi: MultiProgress,
    collect: ProgressBar,
    analyze: ProgressBar,
    enabled: bool,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

impl ProgressMonitor {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                _multi: MultiProgress::new(),
                collect: ProgressBar::hidden(),
                analyze: ProgressBar::hidden(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let collect = multi.add(ProgressBar::new(0));
        collect.set_style(bar_style());
        collect.set_prefix("collect");
        collect.enable_steady_tick(Duration::from_millis(200));

        let analyze = multi.add(ProgressBar::new(0));
        analyze.set_style(bar_style());
        analyze.set_prefix("analyse");

        Self {
            _multi: multi,
            collect,
            analyze,
            enabled: true,
        }
    }

    pub fn update(&self, snap: &ProgressSnapshot) {
        if !self.enabled {
            return;
        }

        for (bar, stage) in [(&self.collect, &snap.collection), (&self.analyze, &snap.analysis)] {
            bar.set_length(stage.total as u64);
            bar.set_position(stage.completed as u64);
            if stage.failures > 0 {
                bar.set_message(format!("({} failed)", stage.failures));
            }
        }
        if snap.cancelled {
            self.collect.set_message("cancelling...");
        }
    }

    pub fn finish(&self, verdict: Option<RunVerdict>) {
        if !self.enabled {
            return;
        }

        let msg = match verdict {
            Some(RunVerdict::Success) => "✅ done",
            Some(RunVerdict::Partial) => "⚠️ partial",
            Some(RunVerdict::Failed) | None => "❌ failed",
        };
        self.collect.finish();
        self.analyze.finish_with_message(msg);
    }
}

/// Follow `rx` until the run reaches a terminal phase.
pub fn spawn_progress(
    mut rx: watch::Receiver<ProgressSnapshot>,
    monitor: Arc<ProgressMonitor>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snap = rx.borrow_and_update().clone();
            monitor.update(&snap);
            if matches!(snap.phase, RunPhase::Completed | RunPhase::Failed) {
                break;
            }
        }
    })
}
