//! GeoPackage container writer.

use crate::wkb::polygon_blob;
use crate::{GpkgError, Result};
use lidarqc_core::Bounds;
use lidarqc_dataset::{CategoryResult, ReconcileMode};
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// GeoPackage application id: "GPKG".
const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;
/// GeoPackage 1.3 user version.
const GPKG_USER_VERSION: i32 = 10300;

/// One layer written to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    /// Layer (table) name.
    pub name: String,
    /// Rows written.
    pub rows: usize,
}

/// What a write produced.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Every layer written, with its row count.
    pub layers: Vec<LayerReport>,
}

/// Writes check results into a GeoPackage container.
#[derive(Debug)]
pub struct GpkgWriter {
    conn: Connection,
    srs_id: i32,
}

impl GpkgWriter {
    /// Create or open the container at `path`.
    ///
    /// The file is created if absent; an existing container keeps its
    /// other layers, but layers written by [`write`](Self::write) replace
    /// any previous layer of the same name. `epsg` sets the spatial
    /// reference registered for the feature layers.
    pub fn create(path: &Path, epsg: Option<u32>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(GpkgError::OutputPath(format!(
                    "parent directory '{}' does not exist",
                    parent.display()
                )));
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "application_id", GPKG_APPLICATION_ID)?;
        conn.pragma_update(None, "user_version", GPKG_USER_VERSION)?;

        let srs_id = epsg.map_or(0, |code| code as i32);
        init_gpkg_schema(&conn, epsg)?;
        Ok(Self { conn, srs_id })
    }

    /// Write one feature layer per category plus the summary layer.
    ///
    /// Every category holding at least one record or reconciliation entry
    /// gets a layer; existing layers of the same names are replaced, so
    /// re-running a check on unchanged inputs rewrites identical content.
    pub fn write(
        &mut self,
        results: &[CategoryResult],
        index_feature_count: Option<usize>,
    ) -> Result<WriteReport> {
        let srs_id = self.srs_id;
        let tx = self.conn.transaction()?;
        let mut report = WriteReport::default();

        for result in results {
            if result.records.is_empty() && result.entries.is_empty() {
                continue;
            }
            let rows = write_category_layer(&tx, result, srs_id)?;
            info!(layer = result.category.name(), rows, "layer written");
            report.layers.push(LayerReport {
                name: result.category.name().to_string(),
                rows,
            });
        }

        let rows = write_summary_layer(&tx, results, index_feature_count)?;
        info!(layer = "summary", rows, "layer written");
        report.layers.push(LayerReport {
            name: "summary".to_string(),
            rows,
        });

        tx.commit()?;
        Ok(report)
    }
}

/// Create the GeoPackage metadata tables and spatial reference rows.
fn init_gpkg_schema(conn: &Connection, epsg: Option<u32>) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        );
        CREATE TABLE IF NOT EXISTS gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE,
            min_y DOUBLE,
            max_x DOUBLE,
            max_y DOUBLE,
            srs_id INTEGER,
            CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        );
        CREATE TABLE IF NOT EXISTS gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name)
        );",
    )?;

    let required_srs = [
        (
            "Undefined Cartesian SRS",
            -1i32,
            "NONE",
            -1i32,
            "undefined",
            "undefined Cartesian coordinate reference system",
        ),
        (
            "Undefined geographic SRS",
            0,
            "NONE",
            0,
            "undefined",
            "undefined geographic coordinate reference system",
        ),
        (
            "WGS 84 geodetic",
            4326,
            "EPSG",
            4326,
            "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]]]",
            "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid",
        ),
    ];
    for (name, id, org, org_id, definition, description) in required_srs {
        conn.execute(
            "INSERT OR IGNORE INTO gpkg_spatial_ref_sys
             (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![name, id, org, org_id, definition, description],
        )?;
    }
    if let Some(code) = epsg {
        conn.execute(
            "INSERT OR IGNORE INTO gpkg_spatial_ref_sys
             (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
             VALUES (?1, ?2, 'EPSG', ?2, 'undefined', NULL)",
            params![format!("EPSG:{code}"), code as i32],
        )?;
    }
    Ok(())
}

/// Drop any previous layer of this name and deregister it.
fn replace_layer(tx: &Transaction<'_>, name: &str) -> Result<()> {
    tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{name}\";"))?;
    tx.execute("DELETE FROM gpkg_contents WHERE table_name = ?1", params![name])?;
    tx.execute(
        "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1",
        params![name],
    )?;
    Ok(())
}

fn write_category_layer(
    tx: &Transaction<'_>,
    result: &CategoryResult,
    srs_id: i32,
) -> Result<usize> {
    let name = result.category.name();
    replace_layer(tx, name)?;
    tx.execute_batch(&format!(
        "CREATE TABLE \"{name}\" (
            fid INTEGER PRIMARY KEY AUTOINCREMENT,
            geom BLOB,
            tile_id TEXT,
            category TEXT NOT NULL,
            crs TEXT,
            primary_count INTEGER,
            read_status TEXT,
            match_status TEXT NOT NULL,
            detail TEXT,
            file_path TEXT
        );"
    ))?;

    let records_by_path: HashMap<&Path, &lidarqc_core::TileRecord> = result
        .records
        .iter()
        .map(|r| (r.file_path.as_path(), r))
        .collect();

    let mut extent: Option<Bounds> = None;
    let mut rows = 0usize;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO \"{name}\"
             (geom, tile_id, category, crs, primary_count, read_status, match_status, detail, file_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ))?;
        for entry in &result.entries {
            let record = entry
                .file_path
                .as_deref()
                .and_then(|p| records_by_path.get(p).copied());
            let bounds = entry.bounds.or_else(|| record.and_then(|r| r.bounds));
            if let Some(b) = bounds {
                extent = Some(extent.map_or(b, |e| e.union(&b)));
            }
            let geom = bounds.map(|b| polygon_blob(&b, srs_id));

            // Read problems and reconciliation detail share one column.
            let read_detail = record.and_then(|r| r.read_detail.as_deref());
            let detail = match (entry.detail.as_deref(), read_detail) {
                (Some(a), Some(b)) => Some(format!("{a}; {b}")),
                (Some(a), None) => Some(a.to_string()),
                (None, Some(b)) => Some(b.to_string()),
                (None, None) => None,
            };

            stmt.execute(params![
                geom,
                entry.tile_id,
                result.category.name(),
                record.and_then(|r| r.crs.as_deref()),
                record.and_then(|r| r.primary_count).map(|c| c as i64),
                record.map(|r| r.read_status.name()),
                entry.status.name(),
                detail,
                entry.file_path.as_deref().map(|p| p.display().to_string()),
            ])?;
            rows += 1;
        }
    }

    tx.execute(
        "INSERT INTO gpkg_contents
         (table_name, data_type, identifier, description, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            name,
            format!("{} tiles with reconciliation status", name),
            extent.map(|e| e.min_x),
            extent.map(|e| e.min_y),
            extent.map(|e| e.max_x),
            extent.map(|e| e.max_y),
            srs_id,
        ],
    )?;
    tx.execute(
        "INSERT INTO gpkg_geometry_columns
         (table_name, column_name, geometry_type_name, srs_id, z, m)
         VALUES (?1, 'geom', 'POLYGON', ?2, 0, 0)",
        params![name, srs_id],
    )?;
    Ok(rows)
}

fn write_summary_layer(
    tx: &Transaction<'_>,
    results: &[CategoryResult],
    index_feature_count: Option<usize>,
) -> Result<usize> {
    replace_layer(tx, "summary")?;
    tx.execute_batch(
        "CREATE TABLE summary (
            product TEXT NOT NULL PRIMARY KEY,
            total_files INTEGER,
            unreadable_files INTEGER,
            crs_mismatch_files INTEGER,
            duplicate_files INTEGER,
            matched_count INTEGER,
            missing_count INTEGER,
            orphan_count INTEGER,
            mode TEXT,
            notes TEXT
        );",
    )?;

    let mut rows = 0usize;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO summary
             (product, total_files, unreadable_files, crs_mismatch_files, duplicate_files,
              matched_count, missing_count, orphan_count, mode, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for result in results {
            let summary = &result.summary;
            let notes = match result.mode {
                ReconcileMode::Indexed => None,
                ReconcileMode::SelfConsistency => {
                    Some("missing-tile detection not checked (no tile index)")
                }
            };
            stmt.execute(params![
                result.category.name(),
                summary.total_files as i64,
                summary.unreadable_files as i64,
                summary.crs_mismatch_files as i64,
                summary.duplicate_files as i64,
                summary.matched_count.map(|c| c as i64),
                summary.missing_count.map(|c| c as i64),
                summary.orphan_count.map(|c| c as i64),
                result.mode.name(),
                notes,
            ])?;
            rows += 1;
        }
        if let Some(count) = index_feature_count {
            stmt.execute(params![
                "supplied_tile_index",
                count as i64,
                Option::<i64>::None,
                Option::<i64>::None,
                Option::<i64>::None,
                Option::<i64>::None,
                Option::<i64>::None,
                Option::<i64>::None,
                Option::<&str>::None,
                "feature count of the supplied tile index",
            ])?;
            rows += 1;
        }
    }

    tx.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, description)
         VALUES ('summary', 'attributes', 'summary', 'per-product check summary')",
        params![],
    )?;
    Ok(rows)
}
