//! Diagnostic logging setup
//!
//! Library code emits `tracing` events; the binary decides where they go.
//! Events are written to stderr so they never mix with command output.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("shapeio=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    // Ignore the error when a subscriber is already set (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
