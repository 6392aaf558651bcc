//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real entry point that:
//! - parses CLI arguments and sets up logging
//! - resolves environment defaults for the commands that use them
//! - runs the requested stage(s)
//! - prints the summary and maps the outcome to an exit code

use clap::Parser;

use crate::batch::{AbortHandle, BatchConfig, ImageLayout, run_batch};
use crate::cli::{Cli, Command, ParamsArgs, ParseArgs, RunArgs, SweepArgs};
use crate::config::{Settings, SweepPlan};
use crate::error::AppError;
use crate::report::{
    RecordingReporter, format_batch_summary, format_grid_summary, format_parse_summary,
};
use crate::snakes::{SnakeFormat, parse_snake_tree};
use crate::sweep::{ParameterGrid, WriteOptions, write_parameter_files};

pub mod pipeline;

/// Entry point for the `snakes` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let reporter = RecordingReporter::new();

    match cli.command {
        Command::Params(args) => handle_params(&args, &reporter),
        Command::Run(args) => handle_run(&args, &Settings::from_env()?, &reporter),
        Command::Parse(args) => handle_parse(&args, &Settings::from_env()?, &reporter),
        Command::Sweep(args) => handle_sweep(&args, &Settings::from_env()?, &reporter),
    }
}

fn handle_params(args: &ParamsArgs, reporter: &RecordingReporter) -> Result<(), AppError> {
    let grid = grid_from_args(args)?;
    let options = WriteOptions {
        make_dirs: args.make_dirs,
        overwrite: args.overwrite,
    };
    let written = write_parameter_files(&grid, &args.out, options, reporter)?;
    println!("{}", format_grid_summary(&grid, &args.out, &written));
    Ok(())
}

pub fn grid_from_args(args: &ParamsArgs) -> Result<ParameterGrid, AppError> {
    let mut builder = ParameterGrid::builder();
    for (key, literal) in &args.ranges {
        builder = builder.range_literal(key.clone(), literal);
    }
    for (key, value) in &args.flags {
        builder = builder.flag(key.clone(), *value);
    }
    Ok(builder.build()?)
}

fn handle_run(
    args: &RunArgs,
    settings: &Settings,
    reporter: &RecordingReporter,
) -> Result<(), AppError> {
    let config = batch_config_from_args(args, settings)?;
    let report = run_batch(&config, reporter, &AbortHandle::new())?;
    println!("{}", format_batch_summary(&report));
    pipeline::batch_outcome(&report)
}

pub fn batch_config_from_args(args: &RunArgs, settings: &Settings) -> Result<BatchConfig, AppError> {
    let executable = args
        .executable
        .clone()
        .or_else(|| settings.executable.clone())
        .ok_or_else(|| AppError::config("No tracer executable: pass --executable or set SNAKES_EXECUTABLE."))?;
    Ok(BatchConfig {
        executable,
        image_dir: args.image_dir.clone(),
        params_dir: args.params_dir.clone(),
        output_dir: args.output_dir.clone(),
        log_dir: args.log_dir.clone(),
        layout: if args.subdirs {
            ImageLayout::Subdirectories
        } else {
            ImageLayout::Flat
        },
        workers: args.workers.unwrap_or(settings.workers),
        extra_args: args.extra_args.clone(),
        fail_fast: args.fail_fast,
    })
}

fn handle_parse(
    args: &ParseArgs,
    settings: &Settings,
    reporter: &RecordingReporter,
) -> Result<(), AppError> {
    let format = format_from_args(args, settings)?;
    let tree = parse_snake_tree(&args.root, args.depth, &format, reporter)?;
    println!("{}", format_parse_summary(&args.root, &tree));
    pipeline::parse_outcome(&tree)
}

pub fn format_from_args(args: &ParseArgs, settings: &Settings) -> Result<SnakeFormat, AppError> {
    let mut format = settings.format;
    if let Some(lines) = args.header_lines {
        format.header_lines = lines;
    }
    if let Some(column) = args.x_column {
        format.x_column = column;
    }
    if let Some(column) = args.y_column {
        format.y_column = column;
    }
    if let Some(column) = args.z_column {
        format.z_column = Some(column);
    }
    if args.no_z {
        format.z_column = None;
    }
    format.validate()?;
    Ok(format)
}

fn handle_sweep(
    args: &SweepArgs,
    settings: &Settings,
    reporter: &RecordingReporter,
) -> Result<(), AppError> {
    let plan = SweepPlan::load(&args.plan)?;
    let output = pipeline::run_sweep(&plan, settings, reporter, &AbortHandle::new())?;

    println!(
        "{}",
        format_grid_summary(&output.grid, &plan.params_dir(), &output.parameter_files)
    );
    println!("{}", format_batch_summary(&output.batch));
    println!("{}", format_parse_summary(&plan.output_dir(), &output.outputs));
    output.outcome()
}
