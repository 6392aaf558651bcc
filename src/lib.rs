//! `snake-sweep` library crate.
//!
//! The binary (`snakes`) is a thin wrapper around this library so that:
//!
//! - the sweep, batch and parser stages are testable without the CLI
//! - other tools can drive a stage directly (e.g. parse outputs only)

pub mod app;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod snakes;
pub mod sweep;
