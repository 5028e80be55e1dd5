//! # lidarqc-las
//!
//! LAS/LAZ header reader for point-cloud survey products.
//!
//! Parses the LAS public header block and variable length records (VLRs)
//! to extract the point count, data extent, version, point format and CRS
//! without decoding point payload. LAZ files share the same uncompressed
//! header, so the same read covers both extensions.
//!
//! When a header is internally inconsistent (zero point count or a
//! degenerate extent despite point data being present), an uncompressed
//! file is re-measured with a bounded scan over the point records.
//! Compressed payloads are never decoded; an unusable LAZ header is
//! reported as-is and left to the caller to record.
//!
//! ## Example
//!
//! ```no_run
//! use lidarqc_las::LasInfo;
//!
//! let info = LasInfo::from_file("points/CL2_CB11_2021_1000_4233.laz", 5_000_000)?;
//! println!("LAS {}.{}, {} points", info.version.0, info.version.1, info.point_count);
//! # Ok::<(), lidarqc_las::LasError>(())
//! ```

mod error;
mod header;

pub use error::LasError;
pub use header::LasInfo;

/// Result type for LAS operations.
pub type Result<T> = std::result::Result<T, LasError>;
