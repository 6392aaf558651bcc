//! Progress reporting and run summaries.
//!
//! Components never log through a global; they receive a [`Reporter`] and
//! tell it what happened. [`RecordingReporter`] forwards everything to
//! `tracing` and keeps the error and failure messages so the command can
//! print them again in the final summary.

use std::sync::{Mutex, PoisonError};

pub mod format;

pub use format::*;

/// Sink for user-facing progress messages.
///
/// Implementations must be shareable across worker threads.
pub trait Reporter: Send + Sync {
    /// Routine progress.
    fn info(&self, message: &str);
    /// A unit of work finished successfully.
    fn success(&self, message: &str);
    /// A recoverable failure (one job or one file).
    fn error(&self, message: &str);
    /// A failure that ends the current command.
    fn fail(&self, message: &str);
}

/// Reporter that logs through `tracing` and records problems.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    errors: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_problems(&self) -> bool {
        !self.errors().is_empty() || !self.failures().is_empty()
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn success(&self, message: &str) {
        tracing::info!(outcome = "success", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }

    fn fail(&self, message: &str) {
        tracing::error!(fatal = true, "{message}");
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
