//! Terminal summaries for the three stages.
//!
//! Formatting lives here so the sweep, batch and parser code only return
//! data:
//! - grid: swept ranges and the files written
//! - batch: per-job outcome table plus every failure with command and logs
//! - parse: per-file curve counts plus every file that failed

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{BatchReport, JobReport, JobStatus};
use crate::snakes::TreeParse;
use crate::sweep::ParameterGrid;

/// Summary after writing parameter files.
pub fn format_grid_summary(grid: &ParameterGrid, target_dir: &Path, written: &[PathBuf]) -> String {
    let mut out = String::new();

    out.push_str("=== Parameter sweep ===\n");
    out.push_str(&format!("Target: {}\n", target_dir.display()));
    let swept = grid.swept_keys();
    if swept.is_empty() {
        out.push_str("Swept: none (single parameter set)\n");
    } else {
        out.push_str("Swept:\n");
        for key in swept {
            if let Some(range) = grid.range(key) {
                out.push_str(&format!(
                    "  {key:<36} {range} ({} values, width {})\n",
                    range.len(),
                    range.format().width
                ));
            }
        }
    }
    out.push_str(&format!("Files written: {}\n", written.len()));
    out
}

/// Summary after a batch: one row per job, then the failures in detail.
pub fn format_batch_summary(report: &BatchReport) -> String {
    let mut out = String::new();

    out.push_str("=== Tracer batch ===\n");
    out.push_str(&format!(
        "Started: {} | workers={} | elapsed={}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.workers,
        fmt_duration(report.elapsed),
    ));
    out.push_str(&format!(
        "Jobs: {} total | {} succeeded | {} failed | {} skipped\n",
        report.jobs.len(),
        report.succeeded(),
        report.failures().len(),
        report.skipped(),
    ));

    out.push('\n');
    out.push_str(format!("{:<40} {:<10} {:>10}\n", "job", "status", "elapsed").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<40} {:-<10} {:-<10}\n", "", "", "").trim_end());
    out.push('\n');
    for job in &report.jobs {
        out.push_str(
            format!(
                "{:<40} {:<10} {:>10}\n",
                truncate(&job.job.label(), 40),
                status_label(&job.status),
                fmt_duration(job.elapsed),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    let failures = report.failures();
    if !failures.is_empty() {
        out.push_str("\nFailed jobs:\n");
        for job in failures {
            out.push_str(&format_failure(job));
        }
    }
    out
}

fn format_failure(report: &JobReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("- {}\n", report.job.label()));
    out.push_str(&format!("    command: {}\n", report.job.command_line()));
    match &report.status {
        JobStatus::Failed { exit_code: Some(code) } => {
            out.push_str(&format!("    exit code: {code}\n"));
        }
        JobStatus::Failed { exit_code: None } => {
            out.push_str("    exit code: none (terminated by signal)\n");
        }
        JobStatus::SpawnFailed { message } => {
            out.push_str(&format!("    not started: {message}\n"));
        }
        JobStatus::Succeeded | JobStatus::Skipped => {}
    }
    out.push_str(&format!("    stdout: {}\n", report.job.stdout_log.display()));
    out.push_str(&format!("    stderr: {}\n", report.job.stderr_log.display()));
    out
}

/// Summary after parsing an output tree.
pub fn format_parse_summary(root: &Path, tree: &TreeParse) -> String {
    let mut out = String::new();

    out.push_str("=== Snake outputs ===\n");
    out.push_str(&format!("Root: {}\n", root.display()));
    out.push_str(&format!(
        "Files: {} parsed | {} failed | {} curves\n",
        tree.parsed.len(),
        tree.failed.len(),
        tree.curve_count(),
    ));

    for file in &tree.parsed {
        let junction = if file.result.junction_seen { " +junctions" } else { "" };
        out.push_str(&format!(
            "  {} : {} curves, {} points{junction}\n",
            relative(root, &file.path),
            file.result.curves.len(),
            file.result.point_count(),
        ));
    }

    if !tree.failed.is_empty() {
        out.push_str("\nFailed files:\n");
        for file in &tree.failed {
            out.push_str(&format!("- {}: {}\n", relative(root, &file.path), file.error));
        }
    }
    out
}

fn status_label(status: &JobStatus) -> &'static str {
    match status {
        JobStatus::Succeeded => "ok",
        JobStatus::Failed { .. } => "FAILED",
        JobStatus::SpawnFailed { .. } => "NOT RUN",
        JobStatus::Skipped => "skipped",
    }
}

fn fmt_duration(d: Duration) -> String {
    format!("{:.2}s", d.as_secs_f64())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
