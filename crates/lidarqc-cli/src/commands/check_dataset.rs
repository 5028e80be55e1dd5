//! The `check-dataset` command.
//!
//! Gathers metadata from collections of raster and point-cloud files,
//! reconciles the tile set against the supplied tile index, and writes the
//! results to a GeoPackage.

use crate::CliError;
use clap::Args;
use lidarqc_core::QcConfig;
use lidarqc_dataset::{
    load_tile_index, CatalogBuilder, CategoryResult, FolderClassifier, Overrides, Reconciler,
    TileIndex,
};
use lidarqc_gpkg::{GpkgWriter, WriteReport};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Arguments for `lidarqc check-dataset`.
#[derive(Debug, Args)]
pub struct CheckDatasetArgs {
    /// Directory containing the product folders, e.g.
    /// 01_Classified_Point_Cloud, 02_DEM, 03_DSM. Raster files must be
    /// GeoTIFF; point cloud files may be LAS or LAZ.
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Output GeoPackage path, including the .gpkg extension. Existing
    /// layers with the same names are replaced.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// Project tile index (GeoJSON polygon layer). Without it, only
    /// self-consistency checks run and gap detection is reported as not
    /// checked.
    #[arg(short = 't', long = "tile-index", value_name = "FILE")]
    pub tile_index: Option<PathBuf>,

    /// Folder name of the DEM directory, bypassing name matching.
    #[arg(long = "dem-folder", value_name = "NAME")]
    pub dem_folder: Option<String>,

    /// Folder name of the DSM directory, bypassing name matching.
    #[arg(long = "dsm-folder", value_name = "NAME")]
    pub dsm_folder: Option<String>,

    /// Folder name of the point cloud directory, bypassing name matching.
    #[arg(long = "pc-folder", value_name = "NAME")]
    pub pc_folder: Option<String>,

    /// YAML configuration file overriding keywords, thresholds and
    /// patterns.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads for metadata extraction (default: one per CPU).
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Run the check. Returns the write report on completion; discrepancies
/// are recorded in the container, not raised as errors.
pub fn run(args: &CheckDatasetArgs) -> Result<WriteReport, CliError> {
    if args.output.extension().and_then(|e| e.to_str()) != Some("gpkg") {
        return Err(CliError::Configuration(format!(
            "output file '{}' must end in .gpkg",
            args.output.display()
        )));
    }

    let mut config = match &args.config {
        Some(path) => QcConfig::from_yaml_file(path)?,
        None => QcConfig::default(),
    };
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }

    let overrides = Overrides {
        dem: args.dem_folder.clone(),
        dsm: args.dsm_folder.clone(),
        point_cloud: args.pc_folder.clone(),
    };
    let classifier = FolderClassifier::new(&config);
    let classification = classifier.classify(&args.input_dir, &overrides)?;
    for diagnostic in &classification.diagnostics {
        warn!("{diagnostic}");
    }
    if classification.folders.is_empty() {
        warn!(
            input = %args.input_dir.display(),
            "no product folders classified; output will hold summaries only"
        );
    }

    // A broken index downgrades the whole run to self-consistency mode;
    // it never aborts the check.
    let index: Option<TileIndex> = match &args.tile_index {
        Some(path) => match load_tile_index(path, config.tile_id_field.as_deref()) {
            Ok(index) => {
                info!(
                    index = %path.display(),
                    features = index.features.len(),
                    skipped = index.skipped_features,
                    "tile index loaded"
                );
                Some(index)
            }
            Err(err) => {
                warn!(
                    index = %path.display(),
                    error = %err,
                    "tile index unavailable; falling back to self-consistency checks"
                );
                None
            }
        },
        None => None,
    };

    let builder = CatalogBuilder::new(&config)?;
    let reconciler = Reconciler::new(&config);
    let mut results: Vec<CategoryResult> = Vec::new();
    for (category, folder) in &classification.folders {
        match builder.build(folder, *category) {
            Ok(catalog) => {
                let result = reconciler.reconcile(catalog, index.as_ref());
                for diagnostic in &result.diagnostics {
                    warn!("{diagnostic}");
                }
                info!(
                    category = %result.category,
                    files = result.summary.total_files,
                    unreadable = result.summary.unreadable_files,
                    matched = result.summary.matched_count.map(|c| c as i64).unwrap_or(-1),
                    "category reconciled"
                );
                results.push(result);
            }
            Err(err) => {
                // Fatal for this category only; results already computed
                // for other categories are still written.
                error!(
                    category = %category,
                    folder = %folder.display(),
                    error = %err,
                    "category scan failed; skipping"
                );
            }
        }
    }

    let epsg = config.expected_epsg.or_else(|| detect_epsg(&results));
    let mut writer = GpkgWriter::create(&args.output, epsg)?;
    let report = writer.write(&results, index.as_ref().map(|i| i.features.len()))?;
    for layer in &report.layers {
        info!(layer = %layer.name, rows = layer.rows, "written to geopackage");
    }
    info!(output = %args.output.display(), "check complete");
    Ok(report)
}

/// Spatial reference for the output layers when none is declared: the
/// first CRS any record reported.
fn detect_epsg(results: &[CategoryResult]) -> Option<u32> {
    results
        .iter()
        .flat_map(|r| r.records.iter())
        .filter_map(|record| record.crs.as_deref())
        .find_map(|crs| crs.strip_prefix("EPSG:").and_then(|code| code.parse().ok()))
}
