//! Job enumeration.
//!
//! Planning turns a [`BatchConfig`] into the full list of tracer invocations
//! and checks the filesystem layout up front; [`check_layout`] runs the part
//! of those checks that does not need the parameter files yet. It never creates anything;
//! directories are made by the worker that first needs them.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::BatchError;

/// How the image root is organised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageLayout {
    /// The image root is one image stack.
    #[default]
    Flat,
    /// Every immediate subdirectory of the image root is its own stack.
    Subdirectories,
}

/// Inputs of one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub executable: PathBuf,
    pub image_dir: PathBuf,
    pub params_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub layout: ImageLayout,
    pub workers: usize,
    /// Appended to every invocation after the standard arguments.
    pub extra_args: Vec<String>,
    /// Abort the batch (skip undispatched jobs) after the first failure.
    pub fail_fast: bool,
}

/// One tracer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub executable: PathBuf,
    pub image_source: PathBuf,
    pub parameter_file: PathBuf,
    /// Parameter file stem.
    pub params_name: String,
    /// Image subdirectory name in subdirectory mode.
    pub image_set: Option<String>,
    pub output_dir: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub extra_args: Vec<String>,
}

impl Job {
    /// Short identifier: `<params>` or `<params>/<image-set>`.
    pub fn label(&self) -> String {
        match &self.image_set {
            Some(set) => format!("{}/{set}", self.params_name),
            None => self.params_name.clone(),
        }
    }

    /// Argument vector passed to the tracer (no shell involved).
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--image".into(),
            self.image_source.clone().into(),
            "--parameter".into(),
            self.parameter_file.clone().into(),
            "--snake".into(),
            self.output_dir.clone().into(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }

    /// Human-readable command line for logs and summaries.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_os_str().to_os_string())
            .chain(self.args())
            .map(|arg| quote(&arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '\'') {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Check everything about the layout that does not depend on the parameter
/// files: workers, image root (and its stacks in subdirectory mode),
/// executable, output and log roots.
pub fn check_layout(config: &BatchConfig) -> Result<(), BatchError> {
    checked_image_sets(config).map(|_| ())
}

/// Enumerate a job for every parameter file in `params_dir` and validate the
/// layout.
pub fn plan_jobs(config: &BatchConfig) -> Result<Vec<Job>, BatchError> {
    let image_sets = checked_image_sets(config)?;
    require_dir(&config.params_dir, "parameter")?;

    let param_files = list_parameter_files(&config.params_dir)?;
    if param_files.is_empty() {
        return Err(BatchError::NoParameterFiles {
            dir: config.params_dir.clone(),
        });
    }
    build_jobs(config, &param_files, &image_sets)
}

/// Enumerate jobs for exactly `parameter_files`, ignoring whatever else sits
/// in `params_dir`.
pub fn plan_jobs_for(
    config: &BatchConfig,
    parameter_files: &[PathBuf],
) -> Result<Vec<Job>, BatchError> {
    let image_sets = checked_image_sets(config)?;
    if parameter_files.is_empty() {
        return Err(BatchError::NoParameterFiles {
            dir: config.params_dir.clone(),
        });
    }

    let mut param_files = Vec::with_capacity(parameter_files.len());
    for path in parameter_files {
        if !path.is_file() {
            return Err(BatchError::MissingParameterFile(path.clone()));
        }
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| BatchError::MissingParameterFile(path.clone()))?;
        param_files.push((stem, path.clone()));
    }
    build_jobs(config, &param_files, &image_sets)
}

/// Image stacks to run against (empty in flat mode) once the layout checks
/// pass.
fn checked_image_sets(config: &BatchConfig) -> Result<Vec<String>, BatchError> {
    if config.workers == 0 {
        return Err(BatchError::NoWorkers);
    }
    require_dir(&config.image_dir, "image")?;
    reject_non_dir(&config.output_dir, "output")?;
    reject_non_dir(&config.log_dir, "log")?;

    // A bare program name is resolved through PATH at spawn time.
    let has_dir_part = config.executable.components().count() > 1;
    if has_dir_part && !config.executable.is_file() {
        return Err(BatchError::MissingExecutable(config.executable.clone()));
    }

    match config.layout {
        ImageLayout::Flat => Ok(Vec::new()),
        ImageLayout::Subdirectories => {
            let image_sets = list_subdirectories(&config.image_dir)?;
            if image_sets.is_empty() {
                return Err(BatchError::NoImageSubdirectories {
                    dir: config.image_dir.clone(),
                });
            }
            Ok(image_sets)
        }
    }
}

fn build_jobs(
    config: &BatchConfig,
    param_files: &[(String, PathBuf)],
    image_sets: &[String],
) -> Result<Vec<Job>, BatchError> {
    let mut jobs = Vec::new();
    match config.layout {
        ImageLayout::Flat => {
            for (params_name, parameter_file) in param_files {
                let output_dir = config.output_dir.join(params_name);
                reject_non_dir(&output_dir, "output")?;

                jobs.push(Job {
                    executable: config.executable.clone(),
                    image_source: config.image_dir.clone(),
                    parameter_file: parameter_file.clone(),
                    params_name: params_name.clone(),
                    image_set: None,
                    output_dir,
                    stdout_log: config.log_dir.join(format!("{params_name}_stdout.txt")),
                    stderr_log: config.log_dir.join(format!("{params_name}_stderr.txt")),
                    extra_args: config.extra_args.clone(),
                });
            }
        }
        ImageLayout::Subdirectories => {
            for (params_name, parameter_file) in param_files {
                let params_output = config.output_dir.join(params_name);
                let params_logs = config.log_dir.join(params_name);
                reject_non_dir(&params_output, "output")?;
                reject_non_dir(&params_logs, "log")?;

                for image_set in image_sets {
                    let output_dir = params_output.join(image_set);
                    reject_non_dir(&output_dir, "output")?;

                    jobs.push(Job {
                        executable: config.executable.clone(),
                        image_source: config.image_dir.join(image_set),
                        parameter_file: parameter_file.clone(),
                        params_name: params_name.clone(),
                        image_set: Some(image_set.clone()),
                        output_dir,
                        stdout_log: params_logs.join(format!("{image_set}_stdout.txt")),
                        stderr_log: params_logs.join(format!("{image_set}_stderr.txt")),
                        extra_args: config.extra_args.clone(),
                    });
                }
            }
        }
    }

    Ok(jobs)
}

fn require_dir(path: &Path, role: &'static str) -> Result<(), BatchError> {
    if path.is_dir() {
        return Ok(());
    }
    reject_non_dir(path, role)?;
    Err(BatchError::MissingDirectory {
        path: path.to_path_buf(),
        role,
    })
}

fn reject_non_dir(path: &Path, role: &'static str) -> Result<(), BatchError> {
    if path.exists() && !path.is_dir() {
        return Err(BatchError::NotADirectory {
            path: path.to_path_buf(),
            role,
        });
    }
    Ok(())
}

/// `*.txt` files of `dir` as `(stem, path)`, sorted by file name.
fn list_parameter_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, BatchError> {
    let mut files: Vec<(String, PathBuf)> = read_dir(dir)?
        .into_iter()
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_string();
            Some((stem, path))
        })
        .collect();
    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}

/// Names of the immediate subdirectories of `dir`, sorted.
fn list_subdirectories(dir: &Path) -> Result<Vec<String>, BatchError> {
    let mut names: Vec<String> = read_dir(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| Some(path.file_name()?.to_str()?.to_string()))
        .collect();
    names.sort();
    Ok(names)
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let io_err = |source| BatchError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}
