//! # lidarqc-dataset
//!
//! Dataset classification, tile cataloguing and tiling reconciliation.
//!
//! This crate is the core of the `check-dataset` workflow:
//!
//! 1. [`FolderClassifier`] maps a delivery's subfolders to product
//!    categories by name, honouring explicit caller overrides.
//! 2. [`CatalogBuilder`] scans each classified folder, fanning per-file
//!    metadata reads across a bounded worker pool, and assembles an
//!    immutable [`Catalog`] of [`TileRecord`](lidarqc_core::TileRecord)s.
//! 3. [`Reconciler`] joins each catalog against the tile index - or, when
//!    none is supplied, runs a self-consistency pass - and classifies
//!    every file and every index feature.
//!
//! Per-file problems (corrupt content, CRS disagreements, duplicate tile
//! ids) are recorded as data and never abort a scan. Only configuration
//! problems - a missing input directory, a bad override, an invalid tile
//! id pattern - fail a call.
//!
//! ## Example
//!
//! ```no_run
//! use lidarqc_core::QcConfig;
//! use lidarqc_dataset::{CatalogBuilder, FolderClassifier, Overrides, Reconciler};
//! use std::path::Path;
//!
//! let config = QcConfig::default();
//! let classifier = FolderClassifier::new(&config);
//! let classification = classifier.classify(Path::new("/data/delivery"), &Overrides::default())?;
//!
//! let builder = CatalogBuilder::new(&config)?;
//! let reconciler = Reconciler::new(&config);
//! for (category, folder) in &classification.folders {
//!     let catalog = builder.build(folder, *category)?;
//!     let result = reconciler.reconcile(catalog, None);
//!     println!("{}: {} files", result.category, result.summary.total_files);
//! }
//! # Ok::<(), lidarqc_dataset::DatasetError>(())
//! ```

mod catalog;
mod classify;
mod error;
mod index;
mod readers;
mod reconcile;

pub use catalog::{Catalog, CatalogBuilder, CatalogDiagnostic, CatalogSummary};
pub use classify::{Classification, ClassifierDiagnostic, FolderClassifier, Overrides};
pub use error::{DatasetError, IndexError, Result};
pub use index::{load_tile_index, TileIndex, TileIndexFeature};
pub use readers::{MetadataReader, ReaderRegistry};
pub use reconcile::{CategoryResult, ReconcileMode, ReconciliationEntry, Reconciler};
