//! Command-line parsing for the tracer sweep tool.
//!
//! Parsing stays here; `app` turns the parsed arguments into component
//! configuration and dispatches.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "snakes",
    version,
    about = "Parameter sweeps, batch runs and output parsing for a filament tracer"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write one parameter file per combination of the given ranges.
    Params(ParamsArgs),
    /// Run the tracer for every parameter file (and image subdirectory).
    Run(RunArgs),
    /// Parse tracer output files and summarise the curves found.
    Parse(ParseArgs),
    /// Generate, run and parse in one go from a JSON plan.
    Sweep(SweepArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ParamsArgs {
    /// Directory receiving the parameter files.
    #[arg(long, short = 'o', value_name = "DIR")]
    pub out: PathBuf,

    /// Sweep a parameter: KEY=START-STOP-STEP or KEY=VALUE (repeatable).
    #[arg(long = "set", short = 's', value_name = "KEY=RANGE", value_parser = parse_key_value)]
    pub ranges: Vec<(String, String)>,

    /// Fix a boolean parameter: KEY=true|false (repeatable).
    #[arg(long = "flag", value_name = "KEY=BOOL", value_parser = parse_key_bool)]
    pub flags: Vec<(String, bool)>,

    /// Create the output directory if it is missing.
    #[arg(long)]
    pub make_dirs: bool,

    /// Replace parameter files that already exist.
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Image stack directory (or parent of stacks with --subdirs).
    #[arg(long, value_name = "DIR")]
    pub image_dir: PathBuf,

    /// Directory of parameter files (*.txt).
    #[arg(long, value_name = "DIR")]
    pub params_dir: PathBuf,

    /// Root for tracer output.
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Root for captured stdout/stderr.
    #[arg(long, value_name = "DIR")]
    pub log_dir: PathBuf,

    /// Tracer executable (default: SNAKES_EXECUTABLE).
    #[arg(long, value_name = "PATH")]
    pub executable: Option<PathBuf>,

    /// Parallel tracer processes (default: SNAKES_WORKERS or 5).
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Treat every subdirectory of the image directory as its own stack.
    #[arg(long)]
    pub subdirs: bool,

    /// Stop dispatching new jobs after the first failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Extra arguments passed to every tracer invocation.
    #[arg(last = true, value_name = "TRACER_ARGS")]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ParseArgs {
    /// Tracer output root.
    #[arg(value_name = "DIR")]
    pub root: PathBuf,

    /// Directory levels between the root and the output files
    /// (1 for flat runs, 2 with --subdirs).
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Header lines to skip (default: SNAKES_HEADER_LINES or 30).
    #[arg(long)]
    pub header_lines: Option<usize>,

    /// Token index of x on point lines (default: SNAKES_X_COLUMN or 2).
    #[arg(long)]
    pub x_column: Option<usize>,

    /// Token index of y on point lines (default: SNAKES_Y_COLUMN or 3).
    #[arg(long)]
    pub y_column: Option<usize>,

    /// Token index of z on point lines (default: SNAKES_Z_COLUMN or 4).
    #[arg(long, conflicts_with = "no_z")]
    pub z_column: Option<usize>,

    /// Read x and y only.
    #[arg(long)]
    pub no_z: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    /// JSON sweep plan.
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_key_bool(s: &str) -> Result<(String, bool), String> {
    let (key, value) = parse_key_value(s)?;
    let value = match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        other => return Err(format!("expected true or false for '{key}', got '{other}'")),
    };
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_params_command() {
        let cli = Cli::try_parse_from([
            "snakes",
            "-vv",
            "params",
            "--out",
            "p",
            "--set",
            "alpha=0.01-0.03-0.01",
            "-s",
            "beta = 0.2",
            "--flag",
            "damp-z=TRUE",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Params(args) = cli.command else {
            panic!("expected params");
        };
        assert_eq!(
            args.ranges,
            vec![
                ("alpha".to_string(), "0.01-0.03-0.01".to_string()),
                ("beta".to_string(), "0.2".to_string()),
            ]
        );
        assert_eq!(args.flags, vec![("damp-z".to_string(), true)]);
        assert!(!args.overwrite);
    }

    #[test]
    fn run_collects_trailing_tracer_args() {
        let cli = Cli::try_parse_from([
            "snakes",
            "run",
            "--image-dir",
            "i",
            "--params-dir",
            "p",
            "--output-dir",
            "o",
            "--log-dir",
            "l",
            "--subdirs",
            "--",
            "--threads",
            "1",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.subdirs);
        assert_eq!(args.workers, None);
        assert_eq!(args.extra_args, vec!["--threads", "1"]);
    }

    #[test]
    fn parse_takes_column_overrides() {
        let cli =
            Cli::try_parse_from(["snakes", "parse", "out", "--y-column", "4", "--z-column", "5"])
                .unwrap();
        let Command::Parse(args) = cli.command else {
            panic!("expected parse");
        };
        assert_eq!(args.depth, 1);
        assert_eq!((args.y_column, args.z_column), (Some(4), Some(5)));
        assert!(!args.no_z);

        assert!(
            Cli::try_parse_from(["snakes", "parse", "out", "--z-column", "5", "--no-z"]).is_err()
        );
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(parse_key_value("alpha").is_err());
        assert!(parse_key_value("=1").is_err());
        assert!(parse_key_bool("init-z=maybe").is_err());
        assert!(Cli::try_parse_from(["snakes", "params", "--out", "p", "--set", "alpha"]).is_err());
    }
}
