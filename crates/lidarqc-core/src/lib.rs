//! # lidarqc-core
//!
//! Shared data model and configuration for the LidarQC toolkit.
//!
//! This crate defines the types that flow between the format readers, the
//! dataset catalog, the tiling reconciler and the GeoPackage writer:
//!
//! - [`Category`] - the closed set of product categories (DEM, DSM, point cloud)
//! - [`TileRecord`] - per-file metadata extracted by a format reader
//! - [`Bounds`] - axis-aligned tile footprints with read-only overlap tests
//! - [`TileIdParser`] - derivation of a tile id from a file name
//! - [`QcConfig`] - explicit configuration for keyword matching, overlap
//!   thresholds and reader behaviour
//!
//! It also hosts the GeoTIFF GeoKey directory decoder shared by the raster
//! and point-cloud readers (both formats embed the same key layout).
//!
//! ## Example
//!
//! ```
//! use lidarqc_core::{Bounds, QcConfig, TileIdParser};
//!
//! let config = QcConfig::default();
//! let parser = TileIdParser::new(&config.tile_id_pattern)?;
//! assert_eq!(parser.derive("tile_01"), Some("01".to_string()));
//!
//! let a = Bounds::new(0.0, 0.0, 100.0, 100.0);
//! let b = Bounds::new(50.0, 50.0, 150.0, 150.0);
//! assert!(a.intersects(&b));
//! # Ok::<(), regex::Error>(())
//! ```

mod bounds;
mod config;
mod geokeys;
mod record;
mod tileid;

pub use bounds::Bounds;
pub use config::{CategoryKeywords, ConfigError, QcConfig};
pub use geokeys::{epsg_from_geokeys, epsg_from_wkt, format_epsg};
pub use record::{Category, MatchStatus, ReadStatus, TileRecord};
pub use tileid::TileIdParser;
