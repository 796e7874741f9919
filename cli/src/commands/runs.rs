use std::fmt::Write as _;

use netsentinel_core::config::AppConfig;
use netsentinel_core::record::{RunRecord, RunSummary};
use netsentinel_plugins::factory;

use crate::commands::cli::{RunsArgs, RunsCommand, ShowArgs};
use crate::error::CliError;

/// `runs list` and `runs show`.
pub async fn handle_runs(args: RunsArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let archive = factory::build_archive(cfg).map_err(|e| CliError::Config(e.to_string()))?;

    match args.command {
        RunsCommand::List { json } => {
            let summaries = archive.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries).map_err(anyhow::Error::from)?);
            } else if summaries.is_empty() {
                println!("no archived runs");
            } else {
                print!("{}", format_summaries(&summaries));
            }
        }
        RunsCommand::Show(ShowArgs {
            run_id,
            report,
            json,
        }) => {
            let record = archive.get(&run_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record).map_err(anyhow::Error::from)?);
            } else if report {
                print!("{}", record.composite_report);
            } else {
                print!("{}", format_overview(&record));
            }
        }
    }
    Ok(0)
}

/// Fixed-width table, one row per run, oldest first.
pub fn format_summaries(summaries: &[RunSummary]) -> String {
    let mut out = format!(
        "{:<28} {:<20} {:<20} {:>7} {:>4} {:>6}  {}\n",
        "RUN ID", "STARTED", "MODEL", "DEVICES", "OK", "FAILED", "VERDICT"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<28} {:<20} {:<20} {:>7} {:>4} {:>6}  {}",
            s.run_id,
            s.started_at.format("%Y-%m-%d %H:%M:%S"),
            s.model,
            s.device_count,
            s.success_count,
            s.failure_count,
            s.verdict.as_str()
        );
    }
    out
}

pub fn format_overview(record: &RunRecord) -> String {
    let summary = record.summary();
    let mut out = String::new();
    let _ = writeln!(out, "run:      {}", record.run_id);
    let _ = writeln!(out, "started:  {}", record.started_at.to_rfc3339());
    if let Some(finished) = record.finished_at {
        let _ = writeln!(out, "finished: {}", finished.to_rfc3339());
    }
    let _ = writeln!(out, "model:    {}", record.model);
    let _ = writeln!(
        out,
        "verdict:  {}{}",
        summary.verdict.as_str(),
        if record.partial { " (cancelled)" } else { "" }
    );
    let _ = writeln!(out);
    for result in &record.device_results {
        let status = match (&result.capture.error, &result.analysis.error) {
            (Some(err), _) => format!("collection failed: {err}"),
            (None, Some(err)) => format!("analysis failed: {err}"),
            (None, None) => "ok".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<24} {:<16} {}",
            result.device.id, result.device.host, status
        );
    }
    out
}
