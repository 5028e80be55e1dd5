//! Toolkit configuration.
//!
//! All tunable behaviour lives in one explicit structure that is passed
//! into the classifier, catalog builder and reconciler constructors.
//! Defaults match the common survey delivery layout; a YAML file can
//! override any subset of fields.

use crate::Category;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML or has unknown fields.
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Case-insensitive keyword sets used to classify product subfolders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryKeywords {
    /// Keywords identifying DEM folders.
    pub dem: Vec<String>,
    /// Keywords identifying DSM folders.
    pub dsm: Vec<String>,
    /// Keywords identifying point-cloud folders.
    pub point_cloud: Vec<String>,
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        Self {
            dem: vec!["dem".to_string()],
            dsm: vec!["dsm".to_string()],
            point_cloud: vec![
                "point".to_string(),
                "las".to_string(),
                "laz".to_string(),
            ],
        }
    }
}

/// Configuration for a dataset check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QcConfig {
    /// Folder-name keywords per category.
    pub category_keywords: CategoryKeywords,
    /// Minimum fraction of a file footprint that must be covered by its
    /// tile-index feature to count as matched.
    pub min_overlap_ratio: f64,
    /// Overlap-area ratio above which two same-category footprints are
    /// reported as a conflict in indexless mode. Kept small so that
    /// floating-point slivers along shared edges are not flagged.
    pub overlap_conflict_tolerance: f64,
    /// Regex deriving the tile id from a file stem (first or `id` group).
    pub tile_id_pattern: String,
    /// Attribute field carrying the tile id in the tile-index layer.
    /// When unset, a suitable field is auto-detected.
    pub tile_id_field: Option<String>,
    /// Declared dataset CRS as an EPSG code. Files with a different EPSG
    /// are recorded as `crs_mismatch`. When unset, no CRS check is made.
    pub expected_epsg: Option<u32>,
    /// Worker threads for per-file metadata extraction. Zero selects the
    /// library default (one per logical CPU).
    pub jobs: usize,
    /// File extensions scanned in raster folders.
    pub raster_extensions: Vec<String>,
    /// File extensions scanned in point-cloud folders.
    pub point_cloud_extensions: Vec<String>,
    /// Cap on points inspected by the point-cloud fallback scan.
    pub max_scan_points: u64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            category_keywords: CategoryKeywords::default(),
            min_overlap_ratio: 0.99,
            overlap_conflict_tolerance: 0.001,
            tile_id_pattern: r"(\d+)\D*$".to_string(),
            tile_id_field: None,
            expected_epsg: None,
            jobs: 0,
            raster_extensions: vec!["tif".to_string(), "tiff".to_string()],
            point_cloud_extensions: vec!["las".to_string(), "laz".to_string()],
            max_scan_points: 5_000_000,
        }
    }
}

impl QcConfig {
    /// Load configuration from a YAML file. Fields not present in the file
    /// keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: QcConfig = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    /// Folder-name keywords for a category.
    pub fn keywords_for(&self, category: Category) -> &[String] {
        match category {
            Category::Dem => &self.category_keywords.dem,
            Category::Dsm => &self.category_keywords.dsm,
            Category::PointCloud => &self.category_keywords.point_cloud,
        }
    }

    /// File extensions scanned for a category.
    pub fn extensions_for(&self, category: Category) -> &[String] {
        if category.is_raster() {
            &self.raster_extensions
        } else {
            &self.point_cloud_extensions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QcConfig::default();
        assert_eq!(config.min_overlap_ratio, 0.99);
        assert_eq!(config.keywords_for(Category::Dem), ["dem"]);
        assert_eq!(
            config.keywords_for(Category::PointCloud),
            ["point", "las", "laz"]
        );
        assert_eq!(config.extensions_for(Category::Dsm), ["tif", "tiff"]);
        assert_eq!(config.extensions_for(Category::PointCloud), ["las", "laz"]);
        assert!(config.expected_epsg.is_none());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "min_overlap_ratio: 0.95\nexpected_epsg: 2193\n";
        let config: QcConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.min_overlap_ratio, 0.95);
        assert_eq!(config.expected_epsg, Some(2193));
        // Unspecified fields keep their defaults.
        assert_eq!(config.tile_id_pattern, QcConfig::default().tile_id_pattern);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "min_overlap: 0.5\n";
        assert!(serde_yaml::from_str::<QcConfig>(yaml).is_err());
    }
}
