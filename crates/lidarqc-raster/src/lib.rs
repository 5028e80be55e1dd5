//! # lidarqc-raster
//!
//! GeoTIFF metadata reader for raster survey products (DEM/DSM tiles).
//!
//! Reads everything the dataset check needs from the TIFF header and tag
//! directory - dimensions, geotransform, CRS, nodata - without decoding any
//! pixel payload. Survey deliveries routinely hold thousands of tiles on
//! network storage, so a metadata read must not pull gigabytes of raster
//! data through the wire.
//!
//! ## Example
//!
//! ```no_run
//! use lidarqc_raster::RasterInfo;
//!
//! let info = RasterInfo::from_file("dem/DEM_CB11_2021_1000_4233.tif")?;
//! println!("{}x{} cells", info.width, info.height);
//! if let Some(bounds) = info.bounds {
//!     println!("covers {:?}", bounds);
//! }
//! # Ok::<(), lidarqc_raster::RasterError>(())
//! ```

mod error;
mod info;

pub use error::RasterError;
pub use info::RasterInfo;

/// Result type for raster metadata operations.
pub type Result<T> = std::result::Result<T, RasterError>;
