//! The end-to-end sweep: parameter files -> tracer batch -> output parsing.
//!
//! The `sweep` command and the integration tests both go through here; the
//! single-stage commands call the components directly.

use std::path::PathBuf;

use crate::batch::{AbortHandle, BatchReport, check_layout, plan_jobs_for, run_jobs};
use crate::config::{Settings, SweepPlan};
use crate::error::{AppError, EXIT_JOB_FAILED, EXIT_NOTHING_TO_DO, EXIT_PARSE_FAILED};
use crate::report::Reporter;
use crate::snakes::{TreeParse, parse_snake_dirs};
use crate::sweep::{ParameterGrid, write_parameter_files};

/// Everything a sweep produced.
#[derive(Debug)]
pub struct SweepOutput {
    pub grid: ParameterGrid,
    pub parameter_files: Vec<PathBuf>,
    pub batch: BatchReport,
    pub outputs: TreeParse,
}

impl SweepOutput {
    /// Job failures outrank parse failures.
    pub fn outcome(&self) -> Result<(), AppError> {
        batch_outcome(&self.batch)?;
        parse_outcome(&self.outputs)
    }
}

pub fn run_sweep(
    plan: &SweepPlan,
    settings: &Settings,
    reporter: &dyn Reporter,
    abort: &AbortHandle,
) -> Result<SweepOutput, AppError> {
    // Nothing is written until the plan and the layout check out.
    let grid = plan.grid()?;
    let config = plan.batch_config(settings)?;
    check_layout(&config)?;

    let parameter_files =
        write_parameter_files(&grid, &config.params_dir, plan.write_options(), reporter)?;

    // Only this sweep's parameter sets run and only their outputs are read;
    // the work directory may hold files from earlier sweeps.
    let jobs = plan_jobs_for(&config, &parameter_files)?;
    let output_dirs: Vec<PathBuf> = jobs.iter().map(|job| job.output_dir.clone()).collect();
    let batch = run_jobs(jobs, config.workers, config.fail_fast, reporter, abort)?;

    let outputs = parse_snake_dirs(&output_dirs, &settings.format, reporter)?;

    Ok(SweepOutput {
        grid,
        parameter_files,
        batch,
        outputs,
    })
}

/// Exit status of a finished batch.
pub fn batch_outcome(report: &BatchReport) -> Result<(), AppError> {
    if report.all_succeeded() {
        return Ok(());
    }
    Err(AppError::new(
        EXIT_JOB_FAILED,
        format!(
            "{} of {} tracer jobs failed ({} skipped).",
            report.failures().len(),
            report.jobs.len(),
            report.skipped()
        ),
    ))
}

/// Exit status of a parsed output tree.
pub fn parse_outcome(tree: &TreeParse) -> Result<(), AppError> {
    if tree.file_count() == 0 {
        return Err(AppError::new(EXIT_NOTHING_TO_DO, "No tracer output files found."));
    }
    if !tree.failed.is_empty() {
        return Err(AppError::new(
            EXIT_PARSE_FAILED,
            format!(
                "{} of {} output files failed to parse.",
                tree.failed.len(),
                tree.file_count()
            ),
        ));
    }
    Ok(())
}
