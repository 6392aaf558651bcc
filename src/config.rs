//! Environment defaults and sweep plans.
//!
//! Precedence: command-line flag, then environment (a `.env` file is loaded
//! first when present), then built-in default.
//!
//! Recognised variables:
//! - `SNAKES_EXECUTABLE`: tracer binary
//! - `SNAKES_WORKERS`: parallel tracer processes (default 5)
//! - `SNAKES_HEADER_LINES`, `SNAKES_X_COLUMN`, `SNAKES_Y_COLUMN`: output layout
//! - `SNAKES_Z_COLUMN`: z token index, or `none` for 2-D output

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::batch::{BatchConfig, ImageLayout};
use crate::error::AppError;
use crate::snakes::SnakeFormat;
use crate::sweep::{Decimal, GridError, NumericRange, ParameterGrid, RangeError, WriteOptions};

pub const DEFAULT_WORKERS: usize = 5;

/// Defaults resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub executable: Option<PathBuf>,
    pub workers: usize,
    pub format: SnakeFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executable: None,
            workers: DEFAULT_WORKERS,
            format: SnakeFormat::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Settings::default();
        if let Some(exe) = lookup("SNAKES_EXECUTABLE").filter(|v| !v.trim().is_empty()) {
            settings.executable = Some(PathBuf::from(exe.trim()));
        }
        if let Some(workers) = number(&lookup, "SNAKES_WORKERS")? {
            if workers == 0 {
                return Err(AppError::config("SNAKES_WORKERS must be at least 1."));
            }
            settings.workers = workers;
        }
        if let Some(lines) = number(&lookup, "SNAKES_HEADER_LINES")? {
            settings.format.header_lines = lines;
        }
        if let Some(column) = number(&lookup, "SNAKES_X_COLUMN")? {
            settings.format.x_column = column;
        }
        if let Some(column) = number(&lookup, "SNAKES_Y_COLUMN")? {
            settings.format.y_column = column;
        }
        if let Some(raw) = lookup("SNAKES_Z_COLUMN") {
            settings.format.z_column = match raw.trim() {
                "" | "none" => None,
                _ => Some(parse_count("SNAKES_Z_COLUMN", &raw)?),
            };
        }
        settings.format.validate()?;
        Ok(settings)
    }
}

fn number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>, AppError> {
    lookup(key).map(|raw| parse_count(key, &raw)).transpose()
}

fn parse_count(key: &str, raw: &str) -> Result<usize, AppError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| AppError::config(format!("{key} must be a non-negative integer, got '{raw}'.")))
}

/// A range written either as a literal (`"0.1-0.5-0.1"`) or a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    Literal(String),
    Number(serde_json::Number),
}

impl RangeSpec {
    fn to_range(&self) -> Result<NumericRange, RangeError> {
        match self {
            RangeSpec::Literal(text) => text.parse(),
            RangeSpec::Number(number) => {
                let text = number.to_string();
                let value = text.parse::<Decimal>().map_err(|e| RangeError::Malformed {
                    input: text.clone(),
                    reason: e.to_string(),
                })?;
                NumericRange::single(value)
            }
        }
    }
}

/// End-to-end sweep description read from JSON.
///
/// Working directories are derived from `work_dir`: parameter files go to
/// `params/`, tracer output to `snakes/`, logs to `logs/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepPlan {
    #[serde(default)]
    pub executable: Option<PathBuf>,
    pub image_dir: PathBuf,
    pub work_dir: PathBuf,
    #[serde(default)]
    pub ranges: BTreeMap<String, RangeSpec>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub subdirs: bool,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub fail_fast: bool,
}

impl SweepPlan {
    /// Read a plan; relative paths are resolved against the plan's directory.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read sweep plan '{}': {e}", path.display()))
        })?;
        let mut plan = Self::from_json(&text)
            .map_err(|e| AppError::config(format!("Invalid sweep plan '{}': {e}", path.display())))?;
        if let Some(base) = path.parent() {
            plan.resolve_relative_to(base);
        }
        Ok(plan)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.image_dir);
        resolve(&mut self.work_dir);
        if let Some(exe) = self.executable.as_mut() {
            // Bare program names stay PATH lookups.
            if exe.components().count() > 1 {
                resolve(exe);
            }
        }
    }

    pub fn params_dir(&self) -> PathBuf {
        self.work_dir.join("params")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join("snakes")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }

    pub fn layout(&self) -> ImageLayout {
        if self.subdirs {
            ImageLayout::Subdirectories
        } else {
            ImageLayout::Flat
        }
    }

    pub fn grid(&self) -> Result<ParameterGrid, GridError> {
        let mut builder = ParameterGrid::builder();
        for (key, spec) in &self.ranges {
            let range = spec.to_range().map_err(|source| GridError::InvalidRange {
                key: key.clone(),
                source,
            })?;
            builder = builder.range(key.clone(), range);
        }
        for (key, value) in &self.flags {
            builder = builder.flag(key.clone(), *value);
        }
        builder.build()
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            make_dirs: true,
            overwrite: self.overwrite,
        }
    }

    /// Batch inputs, falling back to `settings` for executable and workers.
    pub fn batch_config(&self, settings: &Settings) -> Result<BatchConfig, AppError> {
        let executable = self
            .executable
            .clone()
            .or_else(|| settings.executable.clone())
            .ok_or_else(|| {
                AppError::config("No tracer executable: set \"executable\" in the plan or SNAKES_EXECUTABLE.")
            })?;
        Ok(BatchConfig {
            executable,
            image_dir: self.image_dir.clone(),
            params_dir: self.params_dir(),
            output_dir: self.output_dir(),
            log_dir: self.log_dir(),
            layout: self.layout(),
            workers: self.workers.unwrap_or(settings.workers),
            extra_args: self.extra_args.clone(),
            fail_fast: self.fail_fast,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn settings_default_without_environment() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.workers, 5);
        assert_eq!(settings.format.header_lines, 30);
    }

    #[test]
    fn settings_read_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("SNAKES_EXECUTABLE", "/opt/soax/bin/tracer"),
            ("SNAKES_WORKERS", " 8 "),
            ("SNAKES_HEADER_LINES", "28"),
            ("SNAKES_X_COLUMN", "1"),
            ("SNAKES_Y_COLUMN", "2"),
        ]))
        .unwrap();
        assert_eq!(settings.executable, Some(PathBuf::from("/opt/soax/bin/tracer")));
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.format.header_lines, 28);
        assert_eq!((settings.format.x_column, settings.format.y_column), (1, 2));
    }

    #[test]
    fn settings_reject_bad_values() {
        let err = Settings::from_lookup(lookup(&[("SNAKES_WORKERS", "many")])).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
        assert!(err.message().contains("SNAKES_WORKERS"));

        assert!(Settings::from_lookup(lookup(&[("SNAKES_WORKERS", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("SNAKES_X_COLUMN", "3")])).is_err());

        let err = Settings::from_lookup(lookup(&[("SNAKES_Y_COLUMN", "4")])).unwrap_err();
        assert!(err.message().contains("y and z"), "{}", err.message());
        assert!(Settings::from_lookup(lookup(&[("SNAKES_Z_COLUMN", "x")])).is_err());
    }

    #[test]
    fn settings_can_move_or_drop_the_z_column() {
        let settings = Settings::from_lookup(lookup(&[
            ("SNAKES_Y_COLUMN", "4"),
            ("SNAKES_Z_COLUMN", "5"),
        ]))
        .unwrap();
        assert_eq!(settings.format.z_column, Some(5));

        let settings = Settings::from_lookup(lookup(&[
            ("SNAKES_Y_COLUMN", "4"),
            ("SNAKES_Z_COLUMN", "none"),
        ]))
        .unwrap();
        assert_eq!(settings.format.z_column, None);
    }

    #[test]
    fn plan_parses_literals_and_numbers() {
        let plan = SweepPlan::from_json(
            r#"{
                "image_dir": "images",
                "work_dir": "work",
                "ranges": { "alpha": "0.01-0.03-0.01", "beta": 0.2, "gamma": "1E+2" },
                "flags": { "damp-z": true },
                "subdirs": true
            }"#,
        )
        .unwrap();
        let grid = plan.grid().unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.swept_keys(), vec!["alpha"]);
        assert_eq!(grid.range("beta").map(|r| r.len()), Some(1));
        assert_eq!(plan.layout(), ImageLayout::Subdirectories);
        assert_eq!(plan.params_dir(), PathBuf::from("work/params"));
    }

    #[test]
    fn plan_rejects_unknown_fields_and_bad_ranges() {
        assert!(SweepPlan::from_json(r#"{"image_dir":"i","work_dir":"w","bogus":1}"#).is_err());

        let plan =
            SweepPlan::from_json(r#"{"image_dir":"i","work_dir":"w","ranges":{"alpha":"3-1-1"}}"#)
                .unwrap();
        assert!(matches!(plan.grid(), Err(GridError::InvalidRange { .. })));
    }

    #[test]
    fn plan_batch_config_falls_back_to_settings() {
        let plan = SweepPlan::from_json(r#"{"image_dir":"i","work_dir":"w"}"#).unwrap();
        assert!(plan.batch_config(&Settings::default()).is_err());

        let settings = Settings {
            executable: Some(PathBuf::from("tracer")),
            ..Settings::default()
        };
        let config = plan.batch_config(&settings).unwrap();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.log_dir, PathBuf::from("w/logs"));
        assert_eq!(config.layout, ImageLayout::Flat);
    }

    #[test]
    fn plan_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(
            &path,
            r#"{"image_dir":"images","work_dir":"/abs/work","executable":"bin/tracer"}"#,
        )
        .unwrap();
        let plan = SweepPlan::load(&path).unwrap();
        assert_eq!(plan.image_dir, dir.path().join("images"));
        assert_eq!(plan.work_dir, PathBuf::from("/abs/work"));
        assert_eq!(plan.executable, Some(dir.path().join("bin/tracer")));
    }
}
