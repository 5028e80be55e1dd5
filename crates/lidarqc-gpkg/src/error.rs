//! Error types for the GeoPackage writer.

use thiserror::Error;

/// Errors that can occur while writing the output container.
#[derive(Debug, Error)]
pub enum GpkgError {
    /// Database error from the underlying SQLite connection.
    #[error("geopackage database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The output path's parent directory is missing or unwritable.
    #[error("output path not writable: {0}")]
    OutputPath(String),
}
