//! Tracer output parsing.
//!
//! - curve/point types and the configurable file layout (`types`)
//! - the line state machine (`parser`)
//! - whole-file and whole-tree entry points (here)

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use crate::report::Reporter;

pub mod parser;
pub mod types;

pub use parser::*;
pub use types::*;

/// Failures walking an output tree (individual files fail separately).
#[derive(Debug, Error)]
pub enum SnakeTreeError {
    #[error("output directory '{}' does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to list '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub result: ParseResult,
}

#[derive(Debug)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: SnakeParseError,
}

/// Outcome of parsing every output file under a root, both lists sorted by
/// path.
#[derive(Debug, Default)]
pub struct TreeParse {
    pub parsed: Vec<ParsedFile>,
    pub failed: Vec<FailedFile>,
}

impl TreeParse {
    pub fn file_count(&self) -> usize {
        self.parsed.len() + self.failed.len()
    }

    pub fn curve_count(&self) -> usize {
        self.parsed.iter().map(|f| f.result.curves.len()).sum()
    }
}

pub fn parse_snake_file(path: &Path, format: &SnakeFormat) -> Result<ParseResult, SnakeParseError> {
    let file = File::open(path)?;
    parse_snakes(BufReader::new(file), format)
}

/// Parse every `*.txt` file exactly `depth` directory levels below `root`.
///
/// Depth 0 reads files directly in `root`; 1 matches the flat batch layout
/// (`<param>/`); 2 the per-subdirectory layout (`<param>/<images>/`).
pub fn parse_snake_tree(
    root: &Path,
    depth: usize,
    format: &SnakeFormat,
    reporter: &dyn Reporter,
) -> Result<TreeParse, SnakeTreeError> {
    if !root.is_dir() {
        return Err(SnakeTreeError::NotADirectory(root.to_path_buf()));
    }
    let mut files = Vec::new();
    collect_files(root, depth, &mut files)?;
    tracing::debug!(root = %root.display(), depth, files = files.len(), "parsing snake outputs");
    Ok(parse_files(files, format, reporter))
}

/// Parse the `*.txt` files directly inside each of `dirs`.
///
/// Directories that do not exist are skipped: a job that failed before
/// writing anything leaves no output directory behind.
pub fn parse_snake_dirs(
    dirs: &[PathBuf],
    format: &SnakeFormat,
    reporter: &dyn Reporter,
) -> Result<TreeParse, SnakeTreeError> {
    let mut files = Vec::new();
    for dir in dirs.iter().filter(|dir| dir.is_dir()) {
        collect_files(dir, 0, &mut files)?;
    }
    tracing::debug!(dirs = dirs.len(), files = files.len(), "parsing snake outputs");
    Ok(parse_files(files, format, reporter))
}

fn parse_files(
    mut files: Vec<PathBuf>,
    format: &SnakeFormat,
    reporter: &dyn Reporter,
) -> TreeParse {
    files.sort();
    files.dedup();

    let outcomes: Vec<(PathBuf, Result<ParseResult, SnakeParseError>)> = files
        .into_par_iter()
        .map(|path| {
            let result = parse_snake_file(&path, format);
            (path, result)
        })
        .collect();

    let mut tree = TreeParse::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(result) => tree.parsed.push(ParsedFile { path, result }),
            Err(error) => {
                reporter.error(&format!("Failed to parse {}: {error}", path.display()));
                tree.failed.push(FailedFile { path, error });
            }
        }
    }
    tree
}

fn collect_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) -> Result<(), SnakeTreeError> {
    let entries = fs::read_dir(dir).map_err(|source| SnakeTreeError::Walk {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| SnakeTreeError::Walk {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if depth == 0 {
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                out.push(path);
            }
        } else if path.is_dir() {
            collect_files(&path, depth - 1, out)?;
        }
    }
    Ok(())
}
