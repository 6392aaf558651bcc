//! Batch execution of the external filament tracer.
//!
//! - job enumeration and layout checks (`job`)
//! - worker pool, process spawning and per-job reports (`runner`)

use std::path::PathBuf;

use thiserror::Error;

pub mod job;
pub mod runner;

pub use job::*;
pub use runner::*;

/// Configuration problems that stop a batch before any job runs.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{role} directory '{}' does not exist", path.display())]
    MissingDirectory { path: PathBuf, role: &'static str },
    #[error("{role} path '{}' exists but is not a directory", path.display())]
    NotADirectory { path: PathBuf, role: &'static str },
    #[error("tracer executable '{}' does not exist", .0.display())]
    MissingExecutable(PathBuf),
    #[error("parameter file '{}' does not exist", .0.display())]
    MissingParameterFile(PathBuf),
    #[error("no parameter files (*.txt) found in '{}'", dir.display())]
    NoParameterFiles { dir: PathBuf },
    #[error("no image subdirectories found in '{}'", dir.display())]
    NoImageSubdirectories { dir: PathBuf },
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl BatchError {
    /// The inputs were valid but produced no jobs.
    pub fn is_empty_batch(&self) -> bool {
        matches!(
            self,
            BatchError::NoParameterFiles { .. } | BatchError::NoImageSubdirectories { .. }
        )
    }
}
