//! Cartesian parameter grids and parameter-file output.
//!
//! Combinations are produced in catalogue order with the first parameter
//! varying slowest, so sorting the generated filenames reproduces the
//! generation order.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::decimal::Decimal;
use super::params::{PARAMETERS, ParamDefault, ParamValue, ParameterSet, lookup};
use super::range::{FixedFormat, NumericRange, RangeError};
use crate::report::Reporter;

/// Upper bound on the number of parameter files one grid may produce.
pub const MAX_COMBINATIONS: usize = 100_000;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("unknown tracer parameter '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{0}' is given more than once")]
    Duplicate(String),
    #[error("parameter '{0}' is a boolean flag, expected true or false")]
    ExpectedFlag(String),
    #[error("parameter '{0}' is numeric, expected a range like start-stop-step")]
    ExpectedRange(String),
    #[error("invalid range for '{key}': {source}")]
    InvalidRange {
        key: String,
        #[source]
        source: RangeError,
    },
    #[error("grid has more than {limit} combinations", limit = MAX_COMBINATIONS)]
    TooManyCombinations,
    #[error("target directory '{}' does not exist", .0.display())]
    MissingTarget(PathBuf),
    #[error("'{}' exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("parameter file '{}' already exists (enable overwrite to replace it)", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
enum Slot {
    Range {
        key: &'static str,
        range: NumericRange,
        format: FixedFormat,
    },
    Flag {
        key: &'static str,
        value: bool,
    },
}

/// Fully resolved sweep over every tracer parameter.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    slots: Vec<Slot>,
}

/// Collects overrides before resolving them against the catalogue.
#[derive(Debug, Clone, Default)]
pub struct GridBuilder {
    ranges: Vec<(String, Result<NumericRange, RangeError>)>,
    flags: Vec<(String, bool)>,
}

impl GridBuilder {
    pub fn range(mut self, key: impl Into<String>, range: NumericRange) -> Self {
        self.ranges.push((key.into(), Ok(range)));
        self
    }

    /// Add a range from its literal form (`0.1-0.5-0.1` or `0.3`).
    pub fn range_literal(mut self, key: impl Into<String>, literal: &str) -> Self {
        self.ranges.push((key.into(), literal.parse()));
        self
    }

    pub fn flag(mut self, key: impl Into<String>, value: bool) -> Self {
        self.flags.push((key.into(), value));
        self
    }

    pub fn build(self) -> Result<ParameterGrid, GridError> {
        let mut seen: Vec<&str> = Vec::new();
        for key in self
            .ranges
            .iter()
            .map(|(k, _)| k.as_str())
            .chain(self.flags.iter().map(|(k, _)| k.as_str()))
        {
            if lookup(key).is_none() {
                return Err(GridError::UnknownParameter(key.to_string()));
            }
            if seen.contains(&key) {
                return Err(GridError::Duplicate(key.to_string()));
            }
            seen.push(key);
        }

        let mut slots = Vec::with_capacity(PARAMETERS.len());
        for spec in &PARAMETERS {
            let range_override = self.ranges.iter().find(|(k, _)| k == spec.key);
            let flag_override = self.flags.iter().find(|(k, _)| k == spec.key);

            let slot = match spec.default {
                ParamDefault::Flag(default) => {
                    if range_override.is_some() {
                        return Err(GridError::ExpectedFlag(spec.key.to_string()));
                    }
                    Slot::Flag {
                        key: spec.key,
                        value: flag_override.map_or(default, |(_, v)| *v),
                    }
                }
                ParamDefault::Number(default) => {
                    if flag_override.is_some() {
                        return Err(GridError::ExpectedRange(spec.key.to_string()));
                    }
                    let invalid = |source: RangeError| GridError::InvalidRange {
                        key: spec.key.to_string(),
                        source,
                    };
                    let range = match range_override {
                        Some((_, parsed)) => parsed.clone().map_err(invalid)?,
                        None => default_range(default).map_err(invalid)?,
                    };
                    let format = range.format();
                    Slot::Range {
                        key: spec.key,
                        range,
                        format,
                    }
                }
            };
            slots.push(slot);
        }

        let grid = ParameterGrid { slots };
        grid.checked_len().ok_or(GridError::TooManyCombinations)?;
        Ok(grid)
    }
}

fn default_range(text: &str) -> Result<NumericRange, RangeError> {
    let value = text.parse::<Decimal>().map_err(|e| RangeError::Malformed {
        input: text.to_string(),
        reason: e.to_string(),
    })?;
    NumericRange::single(value)
}

impl ParameterGrid {
    pub fn builder() -> GridBuilder {
        GridBuilder::default()
    }

    /// Number of combinations (product of every range's length).
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(MAX_COMBINATIONS)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn checked_len(&self) -> Option<usize> {
        let total = self.slots.iter().try_fold(1usize, |acc, slot| match slot {
            Slot::Range { range, .. } => acc.checked_mul(range.len()),
            Slot::Flag { .. } => Some(acc),
        })?;
        (total <= MAX_COMBINATIONS).then_some(total)
    }

    /// Keys with more than one value, in catalogue order.
    pub fn swept_keys(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Range { key, range, .. } if range.is_swept() => Some(*key),
                _ => None,
            })
            .collect()
    }

    pub fn range(&self, key: &str) -> Option<&NumericRange> {
        self.slots.iter().find_map(|slot| match slot {
            Slot::Range { key: k, range, .. } if *k == key => Some(range),
            _ => None,
        })
    }

    /// Every combination, first parameter varying slowest.
    pub fn parameter_sets(&self) -> Vec<ParameterSet> {
        let mut out = Vec::with_capacity(self.len());
        self.expand(0, Vec::with_capacity(self.slots.len()), Vec::new(), &mut out);
        out
    }

    fn expand(
        &self,
        idx: usize,
        current: Vec<(&'static str, ParamValue)>,
        name_parts: Vec<String>,
        out: &mut Vec<ParameterSet>,
    ) {
        let Some(slot) = self.slots.get(idx) else {
            let mut name = String::from("params");
            for part in &name_parts {
                name.push('_');
                name.push_str(part);
            }
            out.push(ParameterSet::new(name, current));
            return;
        };

        match slot {
            Slot::Flag { key, value } => {
                let mut next = current;
                next.push((*key, ParamValue::Flag(*value)));
                self.expand(idx + 1, next, name_parts, out);
            }
            Slot::Range { key, range, format } => {
                for value in range.values() {
                    let mut next = current.clone();
                    next.push((*key, ParamValue::Number(*value)));
                    let mut parts = name_parts.clone();
                    if range.is_swept() {
                        parts.push(format!("{key}{}", format.render(value)));
                    }
                    self.expand(idx + 1, next, parts, out);
                }
            }
        }
    }
}

/// How [`write_parameter_files`] treats the target directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Create the target directory when it is missing.
    pub make_dirs: bool,
    /// Replace parameter files that already exist.
    pub overwrite: bool,
}

/// Write one parameter file per combination into `target_dir`.
///
/// Nothing is written if any target file already exists and overwriting is
/// off. Returns the written paths in generation order.
pub fn write_parameter_files(
    grid: &ParameterGrid,
    target_dir: &Path,
    options: WriteOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<PathBuf>, GridError> {
    ensure_target_dir(target_dir, options.make_dirs)?;

    let sets = grid.parameter_sets();
    if !options.overwrite {
        if let Some(existing) = sets
            .iter()
            .map(|set| target_dir.join(set.file_name()))
            .find(|path| path.exists())
        {
            reporter.fail(&format!(
                "Parameter file {} already exists",
                existing.display()
            ));
            return Err(GridError::AlreadyExists(existing));
        }
    }

    reporter.info(&format!(
        "Writing {} parameter files to {} (swept: {})",
        sets.len(),
        target_dir.display(),
        describe_swept(grid),
    ));

    let mut written = Vec::with_capacity(sets.len());
    for set in &sets {
        let path = target_dir.join(set.file_name());
        let io_err = |source| GridError::Io {
            path: path.clone(),
            source,
        };

        let mut open = OpenOptions::new();
        open.write(true);
        if options.overwrite {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }
        let mut file = open.open(&path).map_err(io_err)?;
        file.write_all(set.render().as_bytes()).map_err(io_err)?;

        tracing::debug!(path = %path.display(), "wrote parameter file");
        written.push(path);
    }

    reporter.success(&format!("Wrote {} parameter files", written.len()));
    Ok(written)
}

fn describe_swept(grid: &ParameterGrid) -> String {
    let keys = grid.swept_keys();
    if keys.is_empty() {
        return "nothing".to_string();
    }
    keys.iter()
        .map(|key| match grid.range(key) {
            Some(range) => format!("{key}={range}"),
            None => key.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn ensure_target_dir(dir: &Path, make_dirs: bool) -> Result<(), GridError> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(GridError::NotADirectory(dir.to_path_buf()));
    }
    if !make_dirs {
        return Err(GridError::MissingTarget(dir.to_path_buf()));
    }
    fs::create_dir_all(dir).map_err(|source| GridError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;

    fn alpha_beta_grid() -> ParameterGrid {
        ParameterGrid::builder()
            .range_literal("alpha", "0.01-0.03-0.01")
            .range_literal("beta", "0.1-0.4-0.1")
            .build()
            .unwrap()
    }

    #[test]
    fn product_size_matches_range_lengths() {
        let grid = alpha_beta_grid();
        assert_eq!(grid.len(), 12);
        let sets = grid.parameter_sets();
        assert_eq!(sets.len(), 12);
        assert_eq!(grid.swept_keys(), vec!["alpha", "beta"]);
    }

    #[test]
    fn first_parameter_varies_slowest_and_names_sort() {
        let sets = alpha_beta_grid().parameter_sets();
        let names: Vec<&str> = sets.iter().map(|s| s.name()).collect();
        assert_eq!(names[0], "params_alpha0.01_beta0.1");
        assert_eq!(names[1], "params_alpha0.01_beta0.2");
        assert_eq!(names[4], "params_alpha0.02_beta0.1");
        assert_eq!(names[11], "params_alpha0.03_beta0.4");

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
    }

    #[test]
    fn every_set_carries_the_full_catalogue() {
        let sets = alpha_beta_grid().parameter_sets();
        for set in &sets {
            let keys: Vec<&str> = set.entries().iter().map(|(k, _)| *k).collect();
            let catalogue: Vec<&str> = PARAMETERS.iter().map(|s| s.key).collect();
            assert_eq!(keys, catalogue);
        }
        assert_eq!(
            sets[5].get("beta"),
            Some(&ParamValue::Number("0.2".parse().unwrap()))
        );
        assert_eq!(sets[5].get("init-z"), Some(&ParamValue::Flag(true)));
    }

    #[test]
    fn unswept_grid_is_a_single_default_file() {
        let grid = ParameterGrid::builder().flag("damp-z", true).build().unwrap();
        let sets = grid.parameter_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name(), "params");
        assert!(sets[0].render().contains("damp-z\ttrue\n"));
        assert!(sets[0].render().starts_with("intensity-scaling\t0\n"));
    }

    #[test]
    fn rejects_bad_overrides() {
        assert!(matches!(
            ParameterGrid::builder().range_literal("zeta", "1").build(),
            Err(GridError::UnknownParameter(k)) if k == "zeta"
        ));
        assert!(matches!(
            ParameterGrid::builder().range_literal("alpha", "5-1-1").build(),
            Err(GridError::InvalidRange { key, .. }) if key == "alpha"
        ));
        assert!(matches!(
            ParameterGrid::builder().range_literal("init-z", "1").build(),
            Err(GridError::ExpectedFlag(_))
        ));
        assert!(matches!(
            ParameterGrid::builder().flag("alpha", true).build(),
            Err(GridError::ExpectedRange(_))
        ));
        assert!(matches!(
            ParameterGrid::builder()
                .range_literal("alpha", "1")
                .range_literal("alpha", "2")
                .build(),
            Err(GridError::Duplicate(_))
        ));
        assert!(matches!(
            ParameterGrid::builder()
                .range_literal("alpha", "0-999-1")
                .range_literal("beta", "0-999-1")
                .build(),
            Err(GridError::TooManyCombinations)
        ));
    }

    #[test]
    fn writes_files_and_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::new();
        let grid = alpha_beta_grid();

        let written =
            write_parameter_files(&grid, dir.path(), WriteOptions::default(), &reporter).unwrap();
        assert_eq!(written.len(), 12);
        let text = std::fs::read_to_string(&written[0]).unwrap();
        assert!(text.contains("alpha\t0.01\n"));
        assert!(text.contains("beta\t0.1\n"));

        let again = write_parameter_files(&grid, dir.path(), WriteOptions::default(), &reporter);
        assert!(matches!(again, Err(GridError::AlreadyExists(_))));
        assert_eq!(reporter.failures().len(), 1);

        let options = WriteOptions {
            overwrite: true,
            ..WriteOptions::default()
        };
        assert_eq!(
            write_parameter_files(&grid, dir.path(), options, &reporter)
                .unwrap()
                .len(),
            12
        );
    }

    #[test]
    fn missing_target_needs_make_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("params");
        let reporter = RecordingReporter::new();
        let grid = ParameterGrid::builder().build().unwrap();

        assert!(matches!(
            write_parameter_files(&grid, &target, WriteOptions::default(), &reporter),
            Err(GridError::MissingTarget(_))
        ));

        let options = WriteOptions {
            make_dirs: true,
            ..WriteOptions::default()
        };
        let written = write_parameter_files(&grid, &target, options, &reporter).unwrap();
        assert_eq!(written, vec![target.join("params.txt")]);
    }
}
