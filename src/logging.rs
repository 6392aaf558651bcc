//! Log output setup.

use tracing_subscriber::{EnvFilter, fmt};

/// Default filter for a `-v` count: 0 → info, 1 → debug, 2+ → trace.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "snake_sweep=debug,info",
        _ => "trace",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` replaces the verbosity-derived filter when set. Calling this
/// twice is harmless; the first subscriber stays.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
