//! Format readers behind a capability interface.
//!
//! The category set is closed, so dispatch is a fixed registry built once
//! at construction: DEM and DSM share the raster implementation, point
//! clouds get the LAS implementation. Readers convert every recoverable
//! format problem into record data - a scan never aborts because one file
//! is broken.

use lidarqc_core::{format_epsg, Category, QcConfig, ReadStatus, TileIdParser, TileRecord};
use lidarqc_las::LasInfo;
use lidarqc_raster::RasterInfo;
use std::path::Path;
use tracing::debug;

/// Reads one file's metadata into a [`TileRecord`].
///
/// Implementations never fail: unreadable input yields a record with
/// `read_status = Unreadable` and the failure reason in `read_detail`.
pub trait MetadataReader: Send + Sync {
    /// Read `path` as a file of the given category.
    fn read(&self, path: &Path, category: Category) -> TileRecord;
}

/// Compare a file's CRS against the dataset's declared CRS.
///
/// With no declared CRS every file passes; with one, a file that carries a
/// different code - or none at all - cannot be reconciled and is flagged.
fn crs_status(expected: Option<u32>, found: Option<u32>) -> (ReadStatus, Option<String>) {
    match (expected, found) {
        (Some(want), Some(got)) if want != got => (
            ReadStatus::CrsMismatch,
            Some(format!(
                "file CRS {} does not match declared {}",
                format_epsg(got),
                format_epsg(want)
            )),
        ),
        (Some(want), None) => (
            ReadStatus::CrsMismatch,
            Some(format!(
                "file carries no CRS; dataset declares {}",
                format_epsg(want)
            )),
        ),
        _ => (ReadStatus::Ok, None),
    }
}

/// Raster (GeoTIFF) metadata reader for the DEM and DSM categories.
pub struct RasterReader {
    expected_epsg: Option<u32>,
    tile_ids: TileIdParser,
}

impl RasterReader {
    fn new(config: &QcConfig, tile_ids: TileIdParser) -> Self {
        Self {
            expected_epsg: config.expected_epsg,
            tile_ids,
        }
    }
}

impl MetadataReader for RasterReader {
    fn read(&self, path: &Path, category: Category) -> TileRecord {
        let tile_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| self.tile_ids.derive(stem));

        match RasterInfo::from_file(path) {
            Ok(info) => {
                let (read_status, detail) = crs_status(self.expected_epsg, info.epsg);
                TileRecord {
                    file_path: path.to_path_buf(),
                    category,
                    crs: info.epsg.map(format_epsg),
                    bounds: info.bounds,
                    primary_count: Some(info.cell_count()),
                    read_status,
                    tile_id,
                    read_detail: detail,
                }
            }
            Err(err) => {
                debug!(file = %path.display(), error = %err, "raster metadata read failed");
                let mut record =
                    TileRecord::unreadable(path.to_path_buf(), category, err.to_string());
                record.tile_id = tile_id;
                record
            }
        }
    }
}

/// Point-cloud (LAS/LAZ) metadata reader.
pub struct PointCloudReader {
    expected_epsg: Option<u32>,
    tile_ids: TileIdParser,
    max_scan_points: u64,
}

impl PointCloudReader {
    fn new(config: &QcConfig, tile_ids: TileIdParser) -> Self {
        Self {
            expected_epsg: config.expected_epsg,
            tile_ids,
            max_scan_points: config.max_scan_points,
        }
    }
}

impl MetadataReader for PointCloudReader {
    fn read(&self, path: &Path, category: Category) -> TileRecord {
        let tile_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| self.tile_ids.derive(stem));

        match LasInfo::from_file(path, self.max_scan_points) {
            Ok(info) if info.suspect => {
                // Header statistics are unusable and the compressed payload
                // cannot be re-measured without decoding it.
                let mut record = TileRecord::unreadable(
                    path.to_path_buf(),
                    category,
                    "header statistics unusable and payload is compressed".to_string(),
                );
                record.crs = info.epsg.map(format_epsg);
                record.tile_id = tile_id;
                record
            }
            Ok(info) => {
                let (read_status, mut detail) = crs_status(self.expected_epsg, info.epsg);
                if info.recomputed {
                    let note = "header statistics recomputed from point scan";
                    detail = Some(match detail {
                        Some(d) => format!("{d}; {note}"),
                        None => note.to_string(),
                    });
                }
                TileRecord {
                    file_path: path.to_path_buf(),
                    category,
                    crs: info.epsg.map(format_epsg),
                    bounds: info.bounds,
                    primary_count: Some(info.point_count),
                    read_status,
                    tile_id,
                    read_detail: detail,
                }
            }
            Err(err) => {
                debug!(file = %path.display(), error = %err, "point cloud metadata read failed");
                let mut record =
                    TileRecord::unreadable(path.to_path_buf(), category, err.to_string());
                record.tile_id = tile_id;
                record
            }
        }
    }
}

/// Fixed reader registry, one implementation per category variant.
pub struct ReaderRegistry {
    raster: RasterReader,
    point_cloud: PointCloudReader,
}

impl ReaderRegistry {
    /// Build the registry from configuration.
    ///
    /// Fails only on an invalid tile id pattern, which is a configuration
    /// error surfaced before any scan starts.
    pub fn new(config: &QcConfig) -> Result<Self, crate::DatasetError> {
        let tile_ids = TileIdParser::new(&config.tile_id_pattern).map_err(|err| {
            crate::DatasetError::Configuration(format!("invalid tile_id_pattern: {err}"))
        })?;
        Ok(Self {
            raster: RasterReader::new(config, tile_ids.clone()),
            point_cloud: PointCloudReader::new(config, tile_ids),
        })
    }

    /// The reader responsible for a category.
    pub fn reader_for(&self, category: Category) -> &dyn MetadataReader {
        if category.is_raster() {
            &self.raster
        } else {
            &self.point_cloud
        }
    }
}
