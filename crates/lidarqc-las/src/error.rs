//! Error types for the LAS reader.

use thiserror::Error;

/// Errors that can occur when reading LAS/LAZ metadata.
#[derive(Debug, Error)]
pub enum LasError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `LASF` signature.
    #[error("not a LAS file: bad signature {0:02x?}")]
    BadSignature([u8; 4]),

    /// The header block is shorter than the format requires.
    #[error("truncated LAS header: {got} bytes, need {need}")]
    TruncatedHeader {
        /// Bytes available.
        got: usize,
        /// Bytes required by the declared version.
        need: usize,
    },
}
