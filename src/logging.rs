//! Structured logging setup.
//!
//! Logs go to stderr so the stdio language server keeps stdout for the
//! protocol.

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `log_level` overrides the filter. Without it `RUST_LOG` is used, and
/// `default_level` when that is unset or invalid. Installing twice is not an
/// error, so tests may call this freely.
pub fn init_logger(no_color: bool, log_level: Option<&str>, default_level: &str) -> io::Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    };

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_filter(filter);

    match tracing_subscriber::registry().with(stderr_layer).try_init() {
        Ok(()) => Ok(()),
        // Ignore errors due to the subscriber already being set
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}
