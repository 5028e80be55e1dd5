//! Error types for dataset scanning and reconciliation.

use thiserror::Error;

/// Errors that abort a dataset operation.
///
/// Everything below the category-scan boundary is recorded as data
/// (read statuses, diagnostics) rather than raised; these variants cover
/// the directory-resolution boundary and above.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Invalid caller-supplied configuration: missing directories,
    /// conflicting overrides, bad patterns. Fatal before any scan.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O failure enumerating a category folder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker pool could not be constructed.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Errors that make a tile-index layer unusable.
///
/// These never abort a check; the caller logs a warning once and falls
/// back to the indexless self-consistency mode.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file could not be read.
    #[error("failed to read tile index: {0}")]
    Io(#[from] std::io::Error),

    /// The index file is not valid GeoJSON.
    #[error("failed to parse tile index: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level GeoJSON object is not a feature collection.
    #[error("tile index is not a FeatureCollection (found {0:?})")]
    NotAFeatureCollection(String),

    /// No attribute field carrying the tile id could be identified.
    #[error("no tile id field found; tried {0}")]
    MissingTileIdField(String),
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
