//! Error types for the raster reader.

use thiserror::Error;

/// Errors that can occur when reading raster metadata.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error opening the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a parseable TIFF.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),
}
