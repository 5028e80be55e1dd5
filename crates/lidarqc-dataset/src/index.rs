//! Tile-index layer loading.
//!
//! The authoritative tile index is a GeoJSON feature collection of polygon
//! footprints, each carrying the tile id in an attribute field. The field
//! name is configurable; when unset, a suitable field is auto-detected
//! from a fixed candidate list.

use crate::IndexError;
use lidarqc_core::Bounds;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Attribute fields tried, in order, when none is configured.
const TILE_ID_FIELD_CANDIDATES: [&str; 4] = ["tile_id", "tilename", "name", "id"];

/// One polygon feature from the reference index layer.
#[derive(Debug, Clone)]
pub struct TileIndexFeature {
    /// Tile id from the configured attribute field.
    pub tile_id: String,
    /// Axis-aligned footprint of the polygon.
    pub bounds: Bounds,
    /// Expected file count per category, when the index encodes one.
    pub expected_count: Option<u64>,
}

/// The parsed tile index, shared across categories and read once per run.
#[derive(Debug, Clone)]
pub struct TileIndex {
    /// Usable polygon features.
    pub features: Vec<TileIndexFeature>,
    /// Where the layer was loaded from.
    pub source: PathBuf,
    /// Features dropped for missing ids or geometry.
    pub skipped_features: usize,
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Load a tile index from a GeoJSON file.
///
/// Features without a usable id or polygon geometry are skipped with a
/// warning and counted in [`TileIndex::skipped_features`]; a file that
/// cannot be parsed at all is an [`IndexError`], which the caller treats
/// as "index unavailable" rather than a fatal condition.
pub fn load_tile_index(path: &Path, tile_id_field: Option<&str>) -> Result<TileIndex, IndexError> {
    let text = std::fs::read_to_string(path)?;
    let collection: RawCollection = serde_json::from_str(&text)?;
    if collection.kind != "FeatureCollection" {
        return Err(IndexError::NotAFeatureCollection(collection.kind));
    }

    let field = match tile_id_field {
        Some(field) => field.to_string(),
        None => detect_tile_id_field(&collection)?,
    };

    let mut features = Vec::new();
    let mut skipped = 0usize;
    for (n, feature) in collection.features.iter().enumerate() {
        let tile_id = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(&field))
            .and_then(property_as_string);
        let bounds = feature
            .geometry
            .as_ref()
            .filter(|g| g.kind == "Polygon" || g.kind == "MultiPolygon")
            .and_then(|g| polygon_bounds(&g.coordinates));
        match (tile_id, bounds) {
            (Some(tile_id), Some(bounds)) => {
                let expected_count = feature
                    .properties
                    .as_ref()
                    .and_then(|props| props.get("expected_count"))
                    .and_then(Value::as_u64);
                features.push(TileIndexFeature {
                    tile_id,
                    bounds,
                    expected_count,
                });
            }
            _ => {
                warn!(
                    index = %path.display(),
                    feature = n,
                    "skipping index feature without '{field}' id or polygon geometry"
                );
                skipped += 1;
            }
        }
    }

    Ok(TileIndex {
        features,
        source: path.to_path_buf(),
        skipped_features: skipped,
    })
}

/// Pick the tile id field from the first feature carrying properties.
fn detect_tile_id_field(collection: &RawCollection) -> Result<String, IndexError> {
    for feature in &collection.features {
        if let Some(props) = &feature.properties {
            for candidate in TILE_ID_FIELD_CANDIDATES {
                if props.contains_key(candidate) {
                    return Ok(candidate.to_string());
                }
            }
        }
    }
    Err(IndexError::MissingTileIdField(
        TILE_ID_FIELD_CANDIDATES.join(", "),
    ))
}

/// Ids are commonly stored as strings, but numeric fields occur too.
fn property_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Bounding rectangle of every coordinate pair in a (Multi)Polygon value.
fn polygon_bounds(coordinates: &Value) -> Option<Bounds> {
    let mut points = Vec::new();
    collect_points(coordinates, &mut points);
    Bounds::from_points(points)
}

fn collect_points(value: &Value, out: &mut Vec<(f64, f64)>) {
    let Value::Array(items) = value else {
        return;
    };
    // A position is an array whose first two elements are numbers; any
    // other array is a ring, polygon or multipolygon level to descend.
    if items.len() >= 2 {
        if let (Some(x), Some(y)) = (items[0].as_f64(), items[1].as_f64()) {
            out.push((x, y));
            return;
        }
    }
    for item in items {
        collect_points(item, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_index(json: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile_index.geojson");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        (dir, path)
    }

    fn square_feature(id: &str, x0: f64, y0: f64, size: f64) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{"tilename":"{id}"}},"geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}"#,
            x1 = x0 + size,
            y1 = y0 + size,
        )
    }

    #[test]
    fn test_load_polygon_index() {
        let json = format!(
            r#"{{"type":"FeatureCollection","features":[{},{}]}}"#,
            square_feature("01", 0.0, 0.0, 480.0),
            square_feature("02", 480.0, 0.0, 480.0),
        );
        let (_dir, path) = write_index(&json);

        let index = load_tile_index(&path, None).unwrap();
        assert_eq!(index.features.len(), 2);
        assert_eq!(index.skipped_features, 0);
        assert_eq!(index.features[0].tile_id, "01");
        assert_eq!(index.features[0].bounds, Bounds::new(0.0, 0.0, 480.0, 480.0));
        assert_eq!(index.features[1].bounds, Bounds::new(480.0, 0.0, 960.0, 480.0));
    }

    #[test]
    fn test_explicit_field_and_numeric_ids() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"sheet":4233},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
        ]}"#;
        let (_dir, path) = write_index(json);

        let index = load_tile_index(&path, Some("sheet")).unwrap();
        assert_eq!(index.features[0].tile_id, "4233");
    }

    #[test]
    fn test_features_without_id_are_skipped() {
        let json = format!(
            r#"{{"type":"FeatureCollection","features":[{},{{"type":"Feature","properties":{{}},"geometry":null}}]}}"#,
            square_feature("01", 0.0, 0.0, 480.0),
        );
        let (_dir, path) = write_index(&json);

        let index = load_tile_index(&path, None).unwrap();
        assert_eq!(index.features.len(), 1);
        assert_eq!(index.skipped_features, 1);
    }

    #[test]
    fn test_expected_count_property() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"tile_id":"05","expected_count":2},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
        ]}"#;
        let (_dir, path) = write_index(json);

        let index = load_tile_index(&path, None).unwrap();
        assert_eq!(index.features[0].expected_count, Some(2));
    }

    #[test]
    fn test_multipolygon_bounds() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"09"},"geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,1],[0,0]]],[[[5,5],[6,5],[6,6],[5,6],[5,5]]]]}}
        ]}"#;
        let (_dir, path) = write_index(json);

        let index = load_tile_index(&path, None).unwrap();
        assert_eq!(index.features[0].bounds, Bounds::new(0.0, 0.0, 6.0, 6.0));
    }

    #[test]
    fn test_not_a_collection() {
        let json = r#"{"type":"Feature","properties":{},"geometry":null}"#;
        let (_dir, path) = write_index(json);
        assert!(matches!(
            load_tile_index(&path, None),
            Err(IndexError::NotAFeatureCollection(_))
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let (_dir, path) = write_index("{ not json");
        assert!(matches!(
            load_tile_index(&path, None),
            Err(IndexError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_tile_index(Path::new("/nonexistent/index.geojson"), None),
            Err(IndexError::Io(_))
        ));
    }
}
