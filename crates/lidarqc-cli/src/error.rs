//! CLI error type and exit-code policy.

use lidarqc_core::ConfigError;
use lidarqc_dataset::DatasetError;
use lidarqc_gpkg::GpkgError;
use thiserror::Error;

/// Errors that abort a command.
///
/// A completed check always exits 0, discrepancies included; only
/// configuration-level failures reach this type. Per-file and per-category
/// problems are recorded in the output container instead.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line arguments or paths.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure loading the configuration file.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal dataset error (bad input directory, bad overrides).
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// The output container could not be created or written.
    #[error(transparent)]
    Gpkg(#[from] GpkgError),
}
