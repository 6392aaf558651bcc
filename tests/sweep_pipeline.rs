//! End-to-end: plan -> parameter files -> fake tracer -> parsed curves.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use snake_sweep::app::pipeline::run_sweep;
use snake_sweep::batch::AbortHandle;
use snake_sweep::config::{Settings, SweepPlan};
use snake_sweep::error::{EXIT_CONFIG, EXIT_JOB_FAILED, EXIT_PARSE_FAILED};
use snake_sweep::report::RecordingReporter;

static SPAWN_LOCK: Mutex<()> = Mutex::new(());

// Writes two curves; a parameter file whose alpha is 0.03 gets a truncated
// output instead, and beta 0.9 makes the tracer fail.
const TRACER: &str = r#"
param="$4"
out="$6"
grep -q "^beta[[:space:]]0.9$" "$param" && { echo "diverged" >&2; exit 2; }
mkdir -p "$out"
if grep -q "^alpha[[:space:]]0.03$" "$param"; then
  echo "short" > "$out/snakes.txt"
  exit 0
fi
i=0
while [ $i -lt 30 ]; do echo "header $i"; i=$((i+1)); done > "$out/snakes.txt"
printf 'b\n0 0 1 1 0\n#\n#1\na\n0 0 2 2 0\n0 1 3 3 0\n#\n#0\n1 2 3\n' >> "$out/snakes.txt"
"#;

fn setup(dir: &Path, ranges: &str) -> SweepPlan {
    fs::create_dir_all(dir.join("images")).unwrap();
    write_plan(dir, ranges, "")
}

/// Writes the tracer and `plan.json`; `extra` is spliced in as further plan
/// fields (each followed by a comma).
fn write_plan(dir: &Path, ranges: &str, extra: &str) -> SweepPlan {
    let exe = dir.join("tracer.sh");
    fs::write(&exe, format!("#!/bin/sh\n{TRACER}")).unwrap();
    let mut perms = fs::metadata(&exe).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&exe, perms).unwrap();

    let plan_path = dir.join("plan.json");
    fs::write(
        &plan_path,
        format!(
            r#"{{
                "executable": "./tracer.sh",
                "image_dir": "images",
                "work_dir": "work",
                "workers": 2,
                {extra}
                "ranges": {ranges}
            }}"#
        ),
    )
    .unwrap();
    SweepPlan::load(&plan_path).unwrap()
}

#[test]
fn sweep_generates_runs_and_parses() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().unwrap();
    let plan = setup(dir.path(), r#"{ "alpha": "0.01-0.02-0.01", "beta": "0.1-0.2-0.1" }"#);

    let reporter = RecordingReporter::new();
    let output = run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();

    assert_eq!(output.parameter_files.len(), 4);
    assert!(
        output.parameter_files[0].ends_with("work/params/params_alpha0.01_beta0.1.txt"),
        "{:?}",
        output.parameter_files[0]
    );
    assert!(output.batch.all_succeeded());
    assert_eq!(output.outputs.parsed.len(), 4);
    assert!(output.outputs.failed.is_empty());

    let first = &output.outputs.parsed[0].result;
    let names: Vec<&str> = first.curves.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(first.curves[0].points.len(), 2);
    assert_eq!(first.curves[0].closed, Some(false));
    assert!(first.junction_seen);
    assert!(output.outcome().is_ok());
}

#[test]
fn sweep_reports_job_failures_before_parse_failures() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().unwrap();
    let plan = setup(dir.path(), r#"{ "alpha": "0.02-0.03-0.01", "beta": "0.8-0.9-0.1" }"#);

    let reporter = RecordingReporter::new();
    let output = run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();

    // beta 0.9 fails twice; alpha 0.03 with beta 0.8 writes a broken file.
    assert_eq!(output.batch.failures().len(), 2);
    assert_eq!(output.outputs.failed.len(), 1);
    assert_eq!(output.outcome().unwrap_err().exit_code(), EXIT_JOB_FAILED);
}

#[test]
fn sweep_with_only_parse_failures_exits_with_parse_code() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().unwrap();
    let plan = setup(dir.path(), r#"{ "alpha": "0.02-0.03-0.01" }"#);

    let reporter = RecordingReporter::new();
    let output = run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();

    assert!(output.batch.all_succeeded());
    assert_eq!(output.outputs.failed.len(), 1);
    assert_eq!(reporter.errors().len(), 1);
    assert!(reporter.failures().is_empty());
    assert_eq!(output.outcome().unwrap_err().exit_code(), EXIT_PARSE_FAILED);
}

#[test]
fn second_sweep_refuses_to_overwrite_parameter_files() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().unwrap();
    let plan = setup(dir.path(), r#"{ "alpha": "0.01" }"#);

    let reporter = RecordingReporter::new();
    run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();
    let err = run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_CONFIG);
    assert!(err.message().contains("params.txt"), "{}", err.message());
}

#[test]
fn layout_errors_leave_no_parameter_files_behind() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().unwrap();
    let plan = write_plan(dir.path(), r#"{ "alpha": "0.01-0.02-0.01" }"#, "");

    let reporter = RecordingReporter::new();
    let err = run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_CONFIG);
    assert!(err.message().contains("image directory"), "{}", err.message());
    assert!(!dir.path().join("work/params").exists());

    fs::create_dir_all(dir.path().join("images")).unwrap();
    let output = run_sweep(&plan, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();
    assert_eq!(output.parameter_files.len(), 2);
    assert!(output.outcome().is_ok());
}

#[test]
fn later_sweep_ignores_files_from_earlier_sweeps() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().unwrap();
    let first = setup(dir.path(), r#"{ "alpha": "0.01-0.02-0.01" }"#);

    let reporter = RecordingReporter::new();
    let output = run_sweep(&first, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();
    assert_eq!(output.batch.jobs.len(), 2);

    // The earlier outputs get a broken file that must not be read again.
    fs::write(
        dir.path().join("work/snakes/params_alpha0.01/snakes.txt"),
        "short\n",
    )
    .unwrap();

    let second = write_plan(dir.path(), r#"{ "alpha": "0.05" }"#, r#""overwrite": true,"#);
    let output = run_sweep(&second, &Settings::default(), &reporter, &AbortHandle::new()).unwrap();

    let labels: Vec<String> = output.batch.jobs.iter().map(|j| j.job.label()).collect();
    assert_eq!(labels, ["params"]);
    assert_eq!(output.outputs.file_count(), 1);
    assert!(output.outputs.parsed[0].path.ends_with("work/snakes/params/snakes.txt"));
    assert_eq!(output.outputs.parsed[0].result.point_count(), 3);
    assert!(output.outcome().is_ok());
    assert_eq!(fs::read_dir(dir.path().join("work/params")).unwrap().count(), 3);
}
