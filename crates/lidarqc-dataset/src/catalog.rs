//! Tile catalog construction.
//!
//! The catalog builder is the scheduling boundary: it enumerates a
//! category folder, fans per-file metadata reads across a bounded worker
//! pool, and fans the results back into one immutable snapshot. Files are
//! independent units of work; nothing below this boundary shares mutable
//! state, and nothing below it aborts the scan.

use crate::readers::ReaderRegistry;
use crate::{DatasetError, Result};
use lidarqc_core::{Bounds, Category, QcConfig, ReadStatus, TileRecord};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A per-folder condition recorded during the catalog build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogDiagnostic {
    /// Two files in the same category derived the same tile id.
    DuplicateFile {
        /// The contested tile id.
        tile_id: String,
        /// First file encountered (enumeration order); primary for matching.
        primary: PathBuf,
        /// The later file sharing the id.
        duplicate: PathBuf,
    },
}

impl std::fmt::Display for CatalogDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogDiagnostic::DuplicateFile {
                tile_id,
                primary,
                duplicate,
            } => write!(
                f,
                "duplicate tile id '{}': '{}' duplicates '{}'",
                tile_id,
                duplicate.display(),
                primary.display()
            ),
        }
    }
}

/// Per-category aggregate, recomputed from the record and entry sets.
#[derive(Debug, Clone)]
pub struct CatalogSummary {
    /// Category the summary describes.
    pub category: Category,
    /// Files enumerated in the folder.
    pub total_files: usize,
    /// Files whose metadata could not be extracted.
    pub unreadable_files: usize,
    /// Files whose CRS disagrees with the declared dataset CRS.
    pub crs_mismatch_files: usize,
    /// Files sharing a derived tile id with an earlier file.
    pub duplicate_files: usize,
    /// Matched tiles. `None` until reconciliation, and in indexless mode,
    /// where the check cannot be made.
    pub matched_count: Option<usize>,
    /// Index features with no delivered file. `None` when not checked.
    pub missing_count: Option<usize>,
    /// Delivered files absent from the index. `None` when not checked.
    pub orphan_count: Option<usize>,
    /// Union of all readable file footprints.
    pub extent: Option<Bounds>,
}

impl CatalogSummary {
    fn empty(category: Category) -> Self {
        Self {
            category,
            total_files: 0,
            unreadable_files: 0,
            crs_mismatch_files: 0,
            duplicate_files: 0,
            matched_count: None,
            missing_count: None,
            orphan_count: None,
            extent: None,
        }
    }
}

/// Immutable result of scanning one category folder.
#[derive(Debug)]
pub struct Catalog {
    /// Category the folder was classified as.
    pub category: Category,
    /// One record per enumerated file.
    pub records: Vec<TileRecord>,
    /// Duplicate-id conditions found during the build.
    pub diagnostics: Vec<CatalogDiagnostic>,
    /// Aggregate counts. Reconciliation fills the match fields in later.
    pub summary: CatalogSummary,
}

/// Builds tile catalogs using a bounded worker pool.
pub struct CatalogBuilder {
    registry: ReaderRegistry,
    pool: rayon::ThreadPool,
    config: QcConfig,
}

impl CatalogBuilder {
    /// Create a builder with its worker pool.
    ///
    /// `config.jobs` bounds the pool; zero selects one worker per logical
    /// CPU. Large deliveries often live on network mounts, so the bound is
    /// what keeps file-handle and bandwidth use in check.
    pub fn new(config: &QcConfig) -> Result<Self> {
        let registry = ReaderRegistry::new(config)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map_err(|err| DatasetError::ThreadPool(err.to_string()))?;
        Ok(Self {
            registry,
            pool,
            config: config.clone(),
        })
    }

    /// Scan one classified folder into a catalog.
    ///
    /// Only files directly under `folder` with the category's extensions
    /// are considered. An empty folder yields an empty catalog, not an
    /// error; an unlistable folder is a fatal I/O error for this category
    /// only.
    pub fn build(&self, folder: &Path, category: Category) -> Result<Catalog> {
        let mut files = enumerate_files(folder, self.config.extensions_for(category))?;
        files.sort();

        let mut summary = CatalogSummary::empty(category);
        summary.total_files = files.len();
        if files.is_empty() {
            warn!(category = %category, folder = %folder.display(), "no matching files in folder");
            return Ok(Catalog {
                category,
                records: Vec::new(),
                diagnostics: Vec::new(),
                summary,
            });
        }

        info!(
            category = %category,
            folder = %folder.display(),
            files = files.len(),
            "scanning folder"
        );

        let reader = self.registry.reader_for(category);
        let records: Vec<TileRecord> = self
            .pool
            .install(|| files.par_iter().map(|path| reader.read(path, category)).collect());

        let diagnostics = find_duplicates(&records);
        summary.unreadable_files = records
            .iter()
            .filter(|r| r.read_status == ReadStatus::Unreadable)
            .count();
        summary.crs_mismatch_files = records
            .iter()
            .filter(|r| r.read_status == ReadStatus::CrsMismatch)
            .count();
        summary.duplicate_files = diagnostics.len();
        summary.extent = records
            .iter()
            .filter_map(|r| r.bounds)
            .reduce(|a, b| a.union(&b));

        if summary.unreadable_files > 0 {
            warn!(
                category = %category,
                unreadable = summary.unreadable_files,
                total = summary.total_files,
                "some files could not be parsed"
            );
        }

        Ok(Catalog {
            category,
            records,
            diagnostics,
            summary,
        })
    }
}

/// Files directly under `folder` whose extension matches, case-insensitively.
fn enumerate_files(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matched = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)));
        if matched {
            files.push(path);
        }
    }
    Ok(files)
}

/// Detect records sharing a derived tile id.
///
/// The first record in enumeration order holds the id; every later record
/// with the same id produces one diagnostic. Nothing is merged or dropped.
fn find_duplicates(records: &[TileRecord]) -> Vec<CatalogDiagnostic> {
    let mut first_by_id: HashMap<&str, &TileRecord> = HashMap::new();
    let mut diagnostics = Vec::new();
    for record in records {
        let Some(tile_id) = record.tile_id.as_deref() else {
            continue;
        };
        match first_by_id.get(tile_id) {
            Some(primary) => diagnostics.push(CatalogDiagnostic::DuplicateFile {
                tile_id: tile_id.to_string(),
                primary: primary.file_path.clone(),
                duplicate: record.file_path.clone(),
            }),
            None => {
                first_by_id.insert(tile_id, record);
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, tile_id: Option<&str>) -> TileRecord {
        TileRecord {
            file_path: PathBuf::from(path),
            category: Category::Dem,
            crs: None,
            bounds: None,
            primary_count: None,
            read_status: ReadStatus::Ok,
            tile_id: tile_id.map(|s| s.to_string()),
            read_detail: None,
        }
    }

    #[test]
    fn test_find_duplicates() {
        let records = vec![
            record("/d/tile_01.tif", Some("01")),
            record("/d/tile_02.tif", Some("02")),
            record("/d/tile_01_copy.tif", Some("01")),
            record("/d/readme.tif", None),
        ];
        let diagnostics = find_duplicates(&records);
        assert_eq!(diagnostics.len(), 1);
        match &diagnostics[0] {
            CatalogDiagnostic::DuplicateFile {
                tile_id,
                primary,
                duplicate,
            } => {
                assert_eq!(tile_id, "01");
                assert_eq!(primary, &PathBuf::from("/d/tile_01.tif"));
                assert_eq!(duplicate, &PathBuf::from("/d/tile_01_copy.tif"));
            }
        }
    }

    #[test]
    fn test_empty_folder_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = QcConfig::default();
        let builder = CatalogBuilder::new(&config).unwrap();

        let catalog = builder.build(dir.path(), Category::Dem).unwrap();
        assert_eq!(catalog.summary.total_files, 0);
        assert!(catalog.records.is_empty());
    }

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tile_01.TIF"), b"junk").unwrap();
        std::fs::write(dir.path().join("tile_02.tif"), b"junk").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"junk").unwrap();
        std::fs::create_dir(dir.path().join("sub.tif")).unwrap();

        let files = enumerate_files(dir.path(), &["tif".to_string(), "tiff".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_unreadable_files_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tile_01.tif"), b"not a tiff").unwrap();
        std::fs::write(dir.path().join("tile_02.tif"), b"also not a tiff").unwrap();

        let config = QcConfig::default();
        let builder = CatalogBuilder::new(&config).unwrap();
        let catalog = builder.build(dir.path(), Category::Dem).unwrap();

        assert_eq!(catalog.summary.total_files, 2);
        assert_eq!(catalog.summary.unreadable_files, 2);
        assert_eq!(catalog.records.len(), 2);
        // Completeness: one record per file, ids still derived from names.
        let ids: Vec<_> = catalog
            .records
            .iter()
            .map(|r| r.tile_id.as_deref().unwrap())
            .collect();
        assert!(ids.contains(&"01") && ids.contains(&"02"));
    }

    #[test]
    fn test_missing_folder_is_io_error() {
        let config = QcConfig::default();
        let builder = CatalogBuilder::new(&config).unwrap();
        let err = builder
            .build(Path::new("/nonexistent/dem"), Category::Dem)
            .unwrap_err();
        assert!(matches!(err, DatasetError::Io(_)));
    }
}
