//! End-to-end tests for the `check-dataset` command.
//!
//! A synthetic delivery is laid out on disk - point-cloud tiles, a broken
//! raster, a GeoJSON tile index - and the command is driven directly, then
//! the written GeoPackage is inspected over SQL.

use byteorder::{LittleEndian, WriteBytesExt};
use lidarqc_cli::commands::check_dataset::{run, CheckDatasetArgs};
use lidarqc_cli::CliError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

const SCALE: f64 = 0.001;

/// Minimal valid LAS 1.2, point format 0, with the given points.
fn build_las(points: &[(f64, f64)]) -> Vec<u8> {
    let (min_x, max_x) = min_max(points.iter().map(|p| p.0));
    let (min_y, max_y) = min_max(points.iter().map(|p| p.1));

    let mut out = Vec::new();
    out.extend_from_slice(b"LASF");
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(17).unwrap();
    out.extend_from_slice(&[0u8; 16]);
    out.write_u8(1).unwrap();
    out.write_u8(2).unwrap();
    out.extend_from_slice(&[0u8; 64]);
    out.write_u16::<LittleEndian>(40).unwrap();
    out.write_u16::<LittleEndian>(2021).unwrap();
    out.write_u16::<LittleEndian>(227).unwrap(); // header size
    out.write_u32::<LittleEndian>(227).unwrap(); // points follow directly
    out.write_u32::<LittleEndian>(0).unwrap(); // no VLRs
    out.write_u8(0).unwrap(); // point format 0
    out.write_u16::<LittleEndian>(20).unwrap();
    out.write_u32::<LittleEndian>(points.len() as u32).unwrap();
    for _ in 0..5 {
        out.write_u32::<LittleEndian>(0).unwrap();
    }
    for _ in 0..3 {
        out.write_f64::<LittleEndian>(SCALE).unwrap();
    }
    for _ in 0..3 {
        out.write_f64::<LittleEndian>(0.0).unwrap();
    }
    for v in [max_x, min_x, max_y, min_y, 10.0, 0.0] {
        out.write_f64::<LittleEndian>(v).unwrap();
    }
    assert_eq!(out.len(), 227);
    for &(x, y) in points {
        out.write_i32::<LittleEndian>((x / SCALE).round() as i32).unwrap();
        out.write_i32::<LittleEndian>((y / SCALE).round() as i32).unwrap();
        out.write_i32::<LittleEndian>(0).unwrap();
        out.extend_from_slice(&[0u8; 8]);
    }
    out
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn square_feature(id: &str, x0: f64) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{"tilename":"{id}"}},"geometry":{{"type":"Polygon","coordinates":[[[{x0},0],[{x1},0],[{x1},480],[{x0},480],[{x0},0]]]}}}}"#,
        x1 = x0 + 480.0,
    )
}

/// Delivery tree: two good point-cloud tiles, one unreadable DEM tile,
/// and a three-tile index.
fn build_delivery(root: &Path) -> (PathBuf, PathBuf) {
    let pc_dir = root.join("01_Classified_Point_Cloud");
    std::fs::create_dir(&pc_dir).unwrap();
    std::fs::write(
        pc_dir.join("tile_01.las"),
        build_las(&[(10.0, 10.0), (470.0, 470.0), (240.0, 240.0)]),
    )
    .unwrap();
    std::fs::write(
        pc_dir.join("tile_02.las"),
        build_las(&[(490.0, 10.0), (950.0, 470.0)]),
    )
    .unwrap();

    let dem_dir = root.join("02_DEM");
    std::fs::create_dir(&dem_dir).unwrap();
    std::fs::write(dem_dir.join("tile_01.tif"), b"not a tiff").unwrap();

    let index_path = root.join("tile_index.geojson");
    let index = format!(
        r#"{{"type":"FeatureCollection","features":[{},{},{}]}}"#,
        square_feature("01", 0.0),
        square_feature("02", 480.0),
        square_feature("03", 960.0),
    );
    std::fs::write(&index_path, index).unwrap();

    (root.to_path_buf(), index_path)
}

fn check_args(input: &Path, output: &Path, index: Option<&Path>) -> CheckDatasetArgs {
    CheckDatasetArgs {
        input_dir: input.to_path_buf(),
        output: output.to_path_buf(),
        tile_index: index.map(|p| p.to_path_buf()),
        dem_folder: None,
        dsm_folder: None,
        pc_folder: None,
        config: None,
        jobs: Some(2),
    }
}

#[test]
fn test_check_dataset_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (input, index) = build_delivery(dir.path());
    let output = dir.path().join("check.gpkg");

    let report = run(&check_args(&input, &output, Some(&index))).expect("check should complete");

    let names: Vec<_> = report.layers.iter().map(|l| l.name.as_str()).collect();
    assert!(names.contains(&"dem"));
    assert!(names.contains(&"point_cloud"));
    assert!(names.contains(&"summary"));

    let conn = Connection::open(&output).unwrap();

    // Point cloud: two delivered tiles matched, tile 03 missing.
    let matched: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM point_cloud WHERE match_status = 'matched'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(matched, 2);
    let missing: Vec<String> = conn
        .prepare("SELECT tile_id FROM point_cloud WHERE match_status = 'missing_file'")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(missing, ["03"]);

    // Point counts come through from the LAS headers.
    let points: i64 = conn
        .query_row(
            "SELECT primary_count FROM point_cloud WHERE tile_id = '01'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(points, 3);

    // The broken DEM tile is recorded, not dropped: unreadable, claiming
    // its index tile; the other two DEM tiles are missing.
    let (status, match_status): (String, String) = conn
        .query_row(
            "SELECT read_status, match_status FROM dem WHERE file_path IS NOT NULL",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(status, "unreadable");
    assert_eq!(match_status, "count_mismatch");
    let dem_missing: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM dem WHERE match_status = 'missing_file'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dem_missing, 2);

    // Summary layer: per-category counts plus the tile-index row.
    let (pc_matched, pc_missing, pc_orphan): (i64, i64, i64) = conn
        .query_row(
            "SELECT matched_count, missing_count, orphan_count FROM summary WHERE product = 'point_cloud'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!((pc_matched, pc_missing, pc_orphan), (2, 1, 0));
    let index_features: i64 = conn
        .query_row(
            "SELECT total_files FROM summary WHERE product = 'supplied_tile_index'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(index_features, 3);
}

#[test]
fn test_check_dataset_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (input, index) = build_delivery(dir.path());
    let output = dir.path().join("check.gpkg");

    let first = run(&check_args(&input, &output, Some(&index))).unwrap();
    let second = run(&check_args(&input, &output, Some(&index))).unwrap();

    let counts = |report: &lidarqc_gpkg::WriteReport| {
        let mut layers: Vec<(String, usize)> = report
            .layers
            .iter()
            .map(|l| (l.name.clone(), l.rows))
            .collect();
        layers.sort();
        layers
    };
    assert_eq!(counts(&first), counts(&second));

    let conn = Connection::open(&output).unwrap();
    let statuses: Vec<(String, String)> = conn
        .prepare("SELECT tile_id, match_status FROM point_cloud WHERE tile_id IS NOT NULL ORDER BY tile_id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(
        statuses,
        vec![
            ("01".to_string(), "matched".to_string()),
            ("02".to_string(), "matched".to_string()),
            ("03".to_string(), "missing_file".to_string()),
        ]
    );
}

#[test]
fn test_missing_index_falls_back_to_self_consistency() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = build_delivery(dir.path());
    let output = dir.path().join("check.gpkg");

    // Point at a tile index that does not exist: the run must complete in
    // indexless mode, not abort.
    let missing_index = dir.path().join("no_such_index.geojson");
    run(&check_args(&input, &output, Some(&missing_index))).expect("fallback should complete");

    let conn = Connection::open(&output).unwrap();
    let (missing_count, notes): (Option<i64>, String) = conn
        .query_row(
            "SELECT missing_count, notes FROM summary WHERE product = 'point_cloud'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(missing_count.is_none());
    assert!(notes.contains("not checked"));

    let unmatched: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM point_cloud WHERE match_status = 'unmatched'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(unmatched, 2);
}

#[test]
fn test_missing_input_dir_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("check.gpkg");
    let args = check_args(&dir.path().join("no_such_delivery"), &output, None);

    let err = run(&args).unwrap_err();
    assert!(matches!(err, CliError::Dataset(_)));
    // Nothing was written before the failure.
    assert!(!output.exists());
}

#[test]
fn test_output_must_be_gpkg() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = build_delivery(dir.path());
    let args = check_args(&input, &dir.path().join("check.sqlite"), None);

    let err = run(&args).unwrap_err();
    assert!(matches!(err, CliError::Configuration(_)));
}
