use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::ReportOptions;
use crate::record::{DeviceResult, RunRecord};

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render the composite Markdown report for a finished run.
///
/// One section per device in inventory order; failed devices get a banner instead
/// of being left out. Output depends only on the record, so identical records give
/// identical reports.
pub fn render_report(record: &RunRecord, opts: &ReportOptions) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Network Inspection Report\n");
    let _ = writeln!(out, "| Field | Value |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| Run ID | `{}` |", record.run_id);
    let _ = writeln!(out, "| Started | {} |", ts(&record.started_at));
    let _ = writeln!(
        out,
        "| Finished | {} |",
        record.finished_at.as_ref().map(ts).unwrap_or_else(|| "-".into())
    );
    let _ = writeln!(out, "| Model | {} |", record.model);
    let _ = writeln!(
        out,
        "| Devices | {} ({} succeeded, {} failed) |",
        record.device_results.len(),
        record.success_count(),
        record.failure_count()
    );
    let _ = writeln!(out, "| Verdict | {} |", record.verdict().as_str());
    let _ = writeln!(
        out,
        "| Partial | {} |",
        if record.partial { "yes" } else { "no" }
    );

    for result in &record.device_results {
        out.push_str("\n---\n\n");
        render_section(&mut out, result);
    }

    if opts.include_raw_captures && !record.device_results.is_empty() {
        out.push_str("\n---\n\n## Appendix: Raw Captures\n");
        for result in &record.device_results {
            render_raw(&mut out, result, opts.raw_preview_chars);
        }
    }

    out
}

fn render_section(out: &mut String, result: &DeviceResult) {
    let _ = writeln!(out, "## {} ({})\n", result.device.id, result.device.host);
    let _ = writeln!(out, "_Captured at: {}_\n", ts(&result.capture.captured_at));

    let failure = if !result.capture.is_success() {
        Some(("collection", result.capture.error.as_ref()))
    } else if !result.analysis.is_success() {
        Some(("analysis", result.analysis.error.as_ref()))
    } else {
        None
    };

    match failure {
        Some((stage, error)) => {
            let reason = error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            let _ = writeln!(out, "> **❌ FAILED** during {stage}: {reason}");
        }
        None => {
            let _ = writeln!(out, "{}", result.analysis.report_text.trim());
        }
    }
}

fn render_raw(out: &mut String, result: &DeviceResult, limit: usize) {
    let _ = writeln!(out, "\n### {}\n", result.device.id);
    if result.capture.raw_text.is_empty() {
        let _ = writeln!(out, "_No output captured._");
        return;
    }

    let total = result.capture.raw_text.chars().count();
    let preview: String = result.capture.raw_text.chars().take(limit).collect();
    let _ = writeln!(out, "```text\n{}\n```", preview.trim_end());
    if total > limit {
        let _ = writeln!(out, "_(truncated, {total} characters in full capture)_");
    }
}
