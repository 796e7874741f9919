use std::sync::Arc;
use std::time::Duration;

use netsentinel_core::config::{AppConfig, RetryConfig};
use netsentinel_core::{FileInventory, Orchestrator, RunConfig, RunVerdict};
use netsentinel_plugins::factory;

use crate::commands::cli::RunArgs;
use crate::commands::models::resolve_model;
use crate::error::{CliError, EXIT_PARTIAL};
use crate::progress::{spawn_progress, ProgressMonitor};

/// Fold command line overrides into the configured run settings.
pub fn run_config_for(args: &RunArgs, cfg: &AppConfig) -> RunConfig {
    let mut run = factory::build_run_config(cfg);

    if let Some(model) = args.model.as_deref() {
        run = run.with_model(model);
    }
    if let Some(c) = args.collect_concurrency {
        run.collector.concurrency = c as usize;
    }
    if let Some(c) = args.analyze_concurrency {
        run.analysis.concurrency = c as usize;
    }
    if let Some(r) = args.collect_retries {
        run.collector.retry = factory::build_retry(&with_retries(&cfg.collector.retry, r));
    }
    if let Some(r) = args.analyze_retries {
        run.analysis.retry = factory::build_retry(&with_retries(&cfg.analysis.retry, r));
    }
    if let Some(secs) = args.deadline_secs {
        run = run.with_deadline(Some(Duration::from_secs(secs)));
    }
    run
}

fn with_retries(base: &RetryConfig, max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        ..base.clone()
    }
}

/// `run`: exit 0 on a fully successful run, [`EXIT_PARTIAL`] otherwise.
pub async fn handle_run(args: RunArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let mut run_cfg = run_config_for(&args, cfg);

    let transport =
        factory::build_transport(&cfg.ssh).map_err(|e| CliError::Config(e.to_string()))?;
    let backend =
        factory::build_backend(&cfg.inference).map_err(|e| CliError::Config(e.to_string()))?;
    let archive = factory::build_archive(cfg).map_err(|e| CliError::Config(e.to_string()))?;

    if !backend.is_available().await {
        return Err(CliError::InferenceUnavailable(cfg.inference.base_url.clone()));
    }
    let model = resolve_model(backend.as_ref(), &run_cfg.model).await?;
    run_cfg = run_cfg.with_model(model);
    tracing::debug!(config = ?run_cfg, "run configuration");

    let orch = Arc::new(Orchestrator::new(transport, backend, archive));

    let interrupt = {
        let orch = orch.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupt received, finishing in-flight devices...");
                orch.cancel();
            }
        })
    };

    let show_progress = !args.no_progress && atty::is(atty::Stream::Stderr);
    let monitor = Arc::new(ProgressMonitor::new(show_progress));
    let follower = spawn_progress(orch.progress(), monitor.clone());

    let source = FileInventory::new(&args.inventory);
    let result = orch.run(&source, &run_cfg).await;
    interrupt.abort();
    follower.abort();

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            monitor.finish(None);
            return Err(e.into());
        }
    };
    let verdict = record.verdict();
    monitor.finish(Some(verdict));

    eprintln!(
        "run {} {}: {}/{} devices succeeded{}",
        record.run_id,
        verdict.as_str(),
        record.success_count(),
        record.device_results.len(),
        if record.partial { " (cancelled)" } else { "" }
    );
    if args.print_report {
        println!("{}", record.composite_report);
    }

    Ok(if verdict == RunVerdict::Success {
        0
    } else {
        EXIT_PARTIAL
    })
}
