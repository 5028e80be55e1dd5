//! Tiling reconciliation.
//!
//! Reconciliation joins a category's tile catalog against the tile-index
//! layer and classifies every file and every index feature. With no index
//! available, it degrades to a self-consistency pass over the catalog:
//! overlap conflicts are still detectable, missing tiles are not, and the
//! summary says so explicitly instead of reporting zero.

use crate::catalog::{Catalog, CatalogDiagnostic, CatalogSummary};
use crate::index::{TileIndex, TileIndexFeature};
use lidarqc_core::{Bounds, Category, MatchStatus, QcConfig, TileRecord};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::warn;

/// How a category was reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Joined against the supplied tile index.
    Indexed,
    /// No index; internal consistency checks only.
    SelfConsistency,
}

impl ReconcileMode {
    /// Stable lowercase name used in the output container.
    pub fn name(&self) -> &'static str {
        match self {
            ReconcileMode::Indexed => "indexed",
            ReconcileMode::SelfConsistency => "self_consistency",
        }
    }
}

/// One reconciliation outcome: a file, an index feature, or their join.
#[derive(Debug, Clone)]
pub struct ReconciliationEntry {
    /// Tile id shared by the joined sides, when derivable.
    pub tile_id: Option<String>,
    /// The delivered file, absent for `MissingFile` entries.
    pub file_path: Option<PathBuf>,
    /// Classification of this tile.
    pub status: MatchStatus,
    /// Free-form diagnostic, e.g. expected/found counts or offsets.
    pub detail: Option<String>,
    /// Footprint for entries with no file record (the index feature).
    pub bounds: Option<Bounds>,
}

/// Everything the output writer needs for one category.
#[derive(Debug)]
pub struct CategoryResult {
    /// Category the result describes.
    pub category: Category,
    /// Immutable records from the catalog build.
    pub records: Vec<TileRecord>,
    /// One entry per file plus one per unclaimed index feature.
    pub entries: Vec<ReconciliationEntry>,
    /// Duplicate-id diagnostics from the catalog build.
    pub diagnostics: Vec<CatalogDiagnostic>,
    /// Aggregate counts with the match fields filled in.
    pub summary: CatalogSummary,
    /// Mode this category was reconciled in.
    pub mode: ReconcileMode,
}

/// Reconciles tile catalogs against a tile index.
pub struct Reconciler<'a> {
    config: &'a QcConfig,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over the given configuration.
    pub fn new(config: &'a QcConfig) -> Self {
        Self { config }
    }

    /// Reconcile one category's catalog.
    ///
    /// The mode is selected by the presence of `index`. Input geometries
    /// are only read, never mutated; the catalog snapshot moves into the
    /// returned result unchanged.
    pub fn reconcile(&self, catalog: Catalog, index: Option<&TileIndex>) -> CategoryResult {
        match index {
            Some(index) => self.reconcile_indexed(catalog, index),
            None => self.reconcile_self_consistency(catalog),
        }
    }

    fn reconcile_indexed(&self, catalog: Catalog, index: &TileIndex) -> CategoryResult {
        let Catalog {
            category,
            records,
            diagnostics,
            mut summary,
        } = catalog;

        let mut features_by_id: HashMap<&str, &TileIndexFeature> = HashMap::new();
        for feature in &index.features {
            if features_by_id.insert(&feature.tile_id, feature).is_some() {
                warn!(
                    index = %index.source.display(),
                    tile_id = %feature.tile_id,
                    "tile index repeats an id; keeping the last feature"
                );
            }
        }

        // Files per id, for duplicate and expected-count checks.
        let mut files_per_id: HashMap<&str, u64> = HashMap::new();
        for record in &records {
            if let Some(id) = record.tile_id.as_deref() {
                *files_per_id.entry(id).or_default() += 1;
            }
        }

        let mut entries = Vec::new();
        let mut primary_seen: HashSet<&str> = HashSet::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        for record in &records {
            let entry = match record.tile_id.as_deref() {
                None => ReconciliationEntry {
                    tile_id: None,
                    file_path: Some(record.file_path.clone()),
                    status: MatchStatus::OrphanFile,
                    detail: Some("file name does not yield a tile id".to_string()),
                    bounds: None,
                },
                Some(id) => {
                    if !primary_seen.insert(id) {
                        // A later duplicate: the first file stays primary for
                        // matching; this one is flagged but never dropped.
                        ReconciliationEntry {
                            tile_id: Some(id.to_string()),
                            file_path: Some(record.file_path.clone()),
                            status: MatchStatus::CountMismatch,
                            detail: Some(format!(
                                "duplicate tile id: {} files share id '{}'",
                                files_per_id[id], id
                            )),
                            bounds: None,
                        }
                    } else {
                        match features_by_id.get(id) {
                            None => ReconciliationEntry {
                                tile_id: Some(id.to_string()),
                                file_path: Some(record.file_path.clone()),
                                status: MatchStatus::OrphanFile,
                                detail: Some("tile id not present in index".to_string()),
                                bounds: None,
                            },
                            Some(feature) => {
                                claimed.insert(id);
                                self.match_record(record, feature, files_per_id[id])
                            }
                        }
                    }
                }
            };
            entries.push(entry);
        }

        // Every index feature not claimed by a file is a missing tile.
        for feature in &index.features {
            if !claimed.contains(feature.tile_id.as_str()) {
                entries.push(ReconciliationEntry {
                    tile_id: Some(feature.tile_id.clone()),
                    file_path: None,
                    status: MatchStatus::MissingFile,
                    detail: Some("no file delivered for this index tile".to_string()),
                    bounds: Some(feature.bounds),
                });
            }
        }

        summary.matched_count = Some(count_status(&entries, MatchStatus::Matched));
        summary.missing_count = Some(count_status(&entries, MatchStatus::MissingFile));
        summary.orphan_count = Some(count_status(&entries, MatchStatus::OrphanFile));

        CategoryResult {
            category,
            records,
            entries,
            diagnostics,
            summary,
            mode: ReconcileMode::Indexed,
        }
    }

    /// Join one primary record against its index feature.
    fn match_record(
        &self,
        record: &TileRecord,
        feature: &TileIndexFeature,
        files_with_id: u64,
    ) -> ReconciliationEntry {
        let id = feature.tile_id.clone();
        let Some(bounds) = record.bounds else {
            return ReconciliationEntry {
                tile_id: Some(id),
                file_path: Some(record.file_path.clone()),
                status: MatchStatus::CountMismatch,
                detail: Some("file metadata unreadable; footprint not verified".to_string()),
                bounds: None,
            };
        };

        let ratio = bounds.overlap_ratio(&feature.bounds);
        if ratio < self.config.min_overlap_ratio {
            let (fx, fy) = feature.bounds.center();
            let (rx, ry) = bounds.center();
            return ReconciliationEntry {
                tile_id: Some(id),
                file_path: Some(record.file_path.clone()),
                status: MatchStatus::CountMismatch,
                detail: Some(format!(
                    "footprint overlap {:.3} below threshold {:.3}; offset ({:.2}, {:.2}) from index tile",
                    ratio,
                    self.config.min_overlap_ratio,
                    rx - fx,
                    ry - fy
                )),
                bounds: None,
            };
        }

        // Only indexes that encode an expected count get a count check;
        // plain duplicates are already flagged through their own entries
        // and the DuplicateFile diagnostics.
        if let Some(expected) = feature.expected_count {
            if files_with_id != expected {
                return ReconciliationEntry {
                    tile_id: Some(id),
                    file_path: Some(record.file_path.clone()),
                    status: MatchStatus::CountMismatch,
                    detail: Some(format!(
                        "expected {expected} files for this tile, found {files_with_id}"
                    )),
                    bounds: None,
                };
            }
        }

        ReconciliationEntry {
            tile_id: Some(id),
            file_path: Some(record.file_path.clone()),
            status: MatchStatus::Matched,
            detail: None,
            bounds: None,
        }
    }

    fn reconcile_self_consistency(&self, catalog: Catalog) -> CategoryResult {
        let Catalog {
            category,
            records,
            diagnostics,
            mut summary,
        } = catalog;

        // Sweep over footprints sorted by west edge; only records whose x
        // ranges overlap can conflict, which keeps the pass near-linear on
        // grid-shaped deliveries.
        let mut conflicts: HashMap<usize, Vec<String>> = HashMap::new();
        let mut order: Vec<usize> = (0..records.len())
            .filter(|&i| records[i].bounds.is_some())
            .collect();
        order.sort_by(|&a, &b| {
            let ba = records[a].bounds.unwrap();
            let bb = records[b].bounds.unwrap();
            ba.min_x.partial_cmp(&bb.min_x).unwrap_or(std::cmp::Ordering::Equal)
        });
        for (pos, &i) in order.iter().enumerate() {
            let bounds_i = records[i].bounds.unwrap();
            for &j in order[pos + 1..].iter() {
                let bounds_j = records[j].bounds.unwrap();
                if bounds_j.min_x >= bounds_i.max_x {
                    break;
                }
                let overlap = bounds_i.overlap_area(&bounds_j);
                let smaller = bounds_i.area().min(bounds_j.area());
                if smaller > 0.0 && overlap / smaller > self.config.overlap_conflict_tolerance {
                    let pct = 100.0 * overlap / smaller;
                    conflicts
                        .entry(i)
                        .or_default()
                        .push(format!(
                            "overlaps '{}' by {:.1}% of the smaller footprint",
                            records[j].file_path.display(),
                            pct
                        ));
                    conflicts
                        .entry(j)
                        .or_default()
                        .push(format!(
                            "overlaps '{}' by {:.1}% of the smaller footprint",
                            records[i].file_path.display(),
                            pct
                        ));
                }
            }
        }

        let entries: Vec<ReconciliationEntry> = records
            .iter()
            .enumerate()
            .map(|(i, record)| ReconciliationEntry {
                tile_id: record.tile_id.clone(),
                file_path: Some(record.file_path.clone()),
                status: MatchStatus::Unmatched,
                detail: conflicts.get(&i).map(|reasons| reasons.join("; ")),
                bounds: None,
            })
            .collect();

        // Without a reference grid there is nothing to compare against:
        // matched/missing/orphan stay unset and are reported as not checked.
        summary.matched_count = None;
        summary.missing_count = None;
        summary.orphan_count = None;

        CategoryResult {
            category,
            records,
            entries,
            diagnostics,
            summary,
            mode: ReconcileMode::SelfConsistency,
        }
    }
}

fn count_status(entries: &[ReconciliationEntry], status: MatchStatus) -> usize {
    entries.iter().filter(|e| e.status == status).count()
}
