//! Core record types shared across the toolkit.

use crate::Bounds;
use std::path::PathBuf;

/// Product category of a delivered file.
///
/// The set is closed: reader dispatch is keyed on these variants, and adding
/// a category means adding a reader implementation for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Digital elevation model raster (bare earth).
    Dem,
    /// Digital surface model raster (first surface).
    Dsm,
    /// Classified point cloud (LAS/LAZ).
    PointCloud,
}

impl Category {
    /// All categories, in the order they are scanned and written.
    pub const ALL: [Category; 3] = [Category::Dem, Category::Dsm, Category::PointCloud];

    /// Stable lowercase name, used for layer names and summary rows.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Dem => "dem",
            Category::Dsm => "dsm",
            Category::PointCloud => "point_cloud",
        }
    }

    /// True for the raster categories (DEM and DSM).
    pub fn is_raster(&self) -> bool {
        matches!(self, Category::Dem | Category::Dsm)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of reading one file's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Metadata was extracted successfully.
    Ok,
    /// The file could not be parsed; no usable metadata.
    Unreadable,
    /// The file parsed, but its CRS disagrees with the dataset's declared CRS.
    CrsMismatch,
}

impl ReadStatus {
    /// Stable lowercase name used in the output container.
    pub fn name(&self) -> &'static str {
        match self {
            ReadStatus::Ok => "ok",
            ReadStatus::Unreadable => "unreadable",
            ReadStatus::CrsMismatch => "crs_mismatch",
        }
    }
}

/// Reconciliation outcome for a tile-index feature or a discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// Exactly one file and one index feature share the tile id, and their
    /// footprints agree.
    Matched,
    /// An index feature with no corresponding delivered file.
    MissingFile,
    /// A delivered file with no matching index feature.
    OrphanFile,
    /// Id matched but the footprint or file count disagrees with the index.
    CountMismatch,
    /// No index available; the record was only self-consistency checked.
    Unmatched,
}

impl MatchStatus {
    /// Stable lowercase name used in the output container.
    pub fn name(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::MissingFile => "missing_file",
            MatchStatus::OrphanFile => "orphan_file",
            MatchStatus::CountMismatch => "count_mismatch",
            MatchStatus::Unmatched => "unmatched",
        }
    }
}

/// Metadata extracted from one physical file.
///
/// Records are created once during a catalog build and never updated in
/// place; a re-run rebuilds the catalog from scratch.
#[derive(Debug, Clone)]
pub struct TileRecord {
    /// Path of the file the record was read from. Unique within a catalog.
    pub file_path: PathBuf,
    /// Product category the parent folder was classified as.
    pub category: Category,
    /// Coordinate reference identifier, e.g. `EPSG:2193`, when the file
    /// declares one.
    pub crs: Option<String>,
    /// Footprint of the file in its native CRS. `None` when unreadable or
    /// the file carries no georeferencing.
    pub bounds: Option<Bounds>,
    /// Raster: total cell count. Point cloud: point count.
    pub primary_count: Option<u64>,
    /// Outcome of the metadata read.
    pub read_status: ReadStatus,
    /// Tile id derived from the file name; `None` when the name does not
    /// match the configured pattern.
    pub tile_id: Option<String>,
    /// Diagnostic detail for failed or degraded reads.
    pub read_detail: Option<String>,
}

impl TileRecord {
    /// Construct a record for a file that failed metadata extraction.
    pub fn unreadable(file_path: PathBuf, category: Category, detail: String) -> Self {
        Self {
            file_path,
            category,
            crs: None,
            bounds: None,
            primary_count: None,
            read_status: ReadStatus::Unreadable,
            tile_id: None,
            read_detail: Some(detail),
        }
    }

    /// File stem (name without extension), when representable as UTF-8.
    pub fn file_stem(&self) -> Option<&str> {
        self.file_path.file_stem().and_then(|s| s.to_str())
    }
}
