//! Application-level error with a process exit code.
//!
//! Component modules return their own `thiserror` enums; they are folded into
//! `AppError` at the command boundary so `main` can map them to exit codes.

/// Invalid configuration, arguments or filesystem layout.
pub const EXIT_CONFIG: u8 = 2;
/// Nothing to do (no parameter files, no image subdirectories, no outputs).
pub const EXIT_NOTHING_TO_DO: u8 = 3;
/// At least one tracer job failed.
pub const EXIT_JOB_FAILED: u8 = 4;
/// At least one output file could not be parsed.
pub const EXIT_PARSE_FAILED: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::sweep::GridError> for AppError {
    fn from(err: crate::sweep::GridError) -> Self {
        AppError::config(err.to_string())
    }
}

impl From<crate::batch::BatchError> for AppError {
    fn from(err: crate::batch::BatchError) -> Self {
        let code = if err.is_empty_batch() {
            EXIT_NOTHING_TO_DO
        } else {
            EXIT_CONFIG
        };
        AppError::new(code, err.to_string())
    }
}

impl From<crate::snakes::FormatError> for AppError {
    fn from(err: crate::snakes::FormatError) -> Self {
        AppError::config(err.to_string())
    }
}

impl From<crate::snakes::SnakeTreeError> for AppError {
    fn from(err: crate::snakes::SnakeTreeError) -> Self {
        AppError::config(err.to_string())
    }
}
