//! Logging initialization.

use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the default level; `--verbose` raises the default
/// from `info` to `debug`. With a log file, output goes to the file
/// (without ANSI colour) instead of stderr.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<(), String> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|err| format!("cannot open log file '{}': {err}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
