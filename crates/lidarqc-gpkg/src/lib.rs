//! # lidarqc-gpkg
//!
//! GeoPackage output writer for LidarQC check results.
//!
//! Writes one polygon feature layer per product category - each row a
//! delivered file (or a missing index tile) with its metadata and
//! reconciliation status - plus a `summary` attribute layer with one row
//! per category. The container is a standard GeoPackage: the `gpkg_*`
//! metadata tables are maintained so the layers open directly in QGIS or
//! any OGR-based tool.
//!
//! Re-runs are idempotent: layers are replaced, never appended, so the
//! same inputs always produce the same container.

mod error;
mod wkb;
mod writer;

pub use error::GpkgError;
pub use writer::{GpkgWriter, LayerReport, WriteReport};

/// Result type for GeoPackage operations.
pub type Result<T> = std::result::Result<T, GpkgError>;
