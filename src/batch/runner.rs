//! Bounded-concurrency execution of tracer jobs.
//!
//! Jobs run on a dedicated rayon pool sized to the worker count. Each worker
//! blocks on one tracer process at a time. A failed job is recorded and the
//! rest of the batch keeps going; only an explicit abort stops dispatch.

use std::fs::{self, File};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rayon::prelude::*;

use super::BatchError;
use super::job::{BatchConfig, Job, plan_jobs};
use crate::report::Reporter;

/// Shared flag that stops dispatching new jobs.
///
/// Jobs already running are left to finish; jobs not yet started are
/// reported as skipped.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    /// The tracer exited unsuccessfully. `None` when killed by a signal.
    Failed { exit_code: Option<i32> },
    /// The process could not be started (or its log files not created).
    SpawnFailed { message: String },
    /// Never dispatched because the batch was aborted.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: Job,
    pub status: JobStatus,
    pub elapsed: Duration,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Failed { .. } | JobStatus::SpawnFailed { .. }
        )
    }
}

/// Outcome of a whole batch, jobs in enumeration order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    pub workers: usize,
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> Vec<&JobReport> {
        self.jobs.iter().filter(|r| r.is_failure()).collect()
    }

    pub fn skipped(&self) -> usize {
        self.jobs
            .iter()
            .filter(|r| r.status == JobStatus::Skipped)
            .count()
    }

    /// True only when every job ran and succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.jobs.iter().all(JobReport::is_success)
    }
}

/// Plan and run a batch.
pub fn run_batch(
    config: &BatchConfig,
    reporter: &dyn Reporter,
    abort: &AbortHandle,
) -> Result<BatchReport, BatchError> {
    let jobs = plan_jobs(config)?;
    run_jobs(jobs, config.workers, config.fail_fast, reporter, abort)
}

/// Run already planned jobs on a pool of `workers` threads.
pub fn run_jobs(
    jobs: Vec<Job>,
    workers: usize,
    fail_fast: bool,
    reporter: &dyn Reporter,
    abort: &AbortHandle,
) -> Result<BatchReport, BatchError> {
    if workers == 0 {
        return Err(BatchError::NoWorkers);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|idx| format!("tracer-{idx}"))
        .build()?;

    reporter.info(&format!("Running {} jobs on {workers} workers", jobs.len()));
    let started_at = Local::now();
    let clock = Instant::now();

    let reports: Vec<JobReport> = pool.install(|| {
        jobs.into_par_iter()
            .with_max_len(1)
            .map(|job| {
                if abort.is_aborted() {
                    tracing::debug!(job = %job.label(), "skipped after abort");
                    return JobReport {
                        job,
                        status: JobStatus::Skipped,
                        elapsed: Duration::ZERO,
                    };
                }
                let report = execute(job, reporter);
                if fail_fast && report.is_failure() {
                    abort.abort();
                }
                report
            })
            .collect()
    });

    let report = BatchReport {
        started_at,
        elapsed: clock.elapsed(),
        workers,
        jobs: reports,
    };

    let failed = report.failures().len();
    if failed == 0 && report.skipped() == 0 {
        reporter.success(&format!(
            "All {} jobs completed in {:.1?}",
            report.jobs.len(),
            report.elapsed
        ));
    } else {
        reporter.info(&format!(
            "{} of {} jobs succeeded ({failed} failed, {} skipped) in {:.1?}",
            report.succeeded(),
            report.jobs.len(),
            report.skipped(),
            report.elapsed
        ));
    }
    Ok(report)
}

fn execute(job: Job, reporter: &dyn Reporter) -> JobReport {
    let clock = Instant::now();
    let command_line = job.command_line();
    reporter.info(&format!("Executing '{command_line}'"));

    let status = match spawn_and_wait(&job) {
        Ok(exit) if exit.success() => {
            reporter.success(&format!("Completed {command_line}"));
            JobStatus::Succeeded
        }
        Ok(exit) => {
            let code = exit
                .code()
                .map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string());
            reporter.error(&format!(
                "Failed to run {command_line}. return code {code}. STDOUT saved in {}. STDERR saved in {}",
                job.stdout_log.display(),
                job.stderr_log.display(),
            ));
            JobStatus::Failed {
                exit_code: exit.code(),
            }
        }
        Err(message) => {
            reporter.error(&format!("Could not run {command_line}: {message}"));
            JobStatus::SpawnFailed { message }
        }
    };

    JobReport {
        job,
        status,
        elapsed: clock.elapsed(),
    }
}

fn spawn_and_wait(job: &Job) -> Result<ExitStatus, String> {
    fs::create_dir_all(&job.output_dir).map_err(|e| {
        format!(
            "failed to create output directory {}: {e}",
            job.output_dir.display()
        )
    })?;
    for log in [&job.stdout_log, &job.stderr_log] {
        if let Some(parent) = log.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                format!("failed to create log directory {}: {e}", parent.display())
            })?;
        }
    }

    let create_log = |path: &std::path::Path| {
        File::create(path).map_err(|e| format!("failed to create log {}: {e}", path.display()))
    };
    let stdout = create_log(job.stdout_log.as_path())?;
    let stderr = create_log(job.stderr_log.as_path())?;

    Command::new(&job.executable)
        .args(job.args())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|e| format!("failed to start {}: {e}", job.executable.display()))
}
