//! Tile id derivation from file names.
//!
//! Tile ids are the join key between delivered files and the tile-index
//! layer. Derivation is a pure function of the file stem: the same name
//! always produces the same id, across categories, so a DEM tile and a
//! point-cloud tile of the same area agree on their id.

use regex::Regex;

/// Derives tile ids from file stems using a configurable pattern.
///
/// The pattern must contain at least one capture group; the id is taken
/// from a group named `id` when present, otherwise from the first group.
/// The default pattern (see [`crate::QcConfig`]) captures the trailing
/// number of the stem, which covers common survey naming schemes:
///
/// - `tile_01` -> `01`
/// - `DEM_CB11_2021_1000_4233` -> `4233`
/// - `notes.txt`-style stems with no trailing number -> no id
#[derive(Debug, Clone)]
pub struct TileIdParser {
    pattern: Regex,
}

impl TileIdParser {
    /// Compile a parser from a regex pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Derive the tile id for a file stem, or `None` when the stem does not
    /// match the pattern.
    pub fn derive(&self, stem: &str) -> Option<String> {
        let captures = self.pattern.captures(stem)?;
        let group = captures
            .name("id")
            .or_else(|| captures.get(1))
            .or_else(|| captures.get(0))?;
        let id = group.as_str();
        if id.is_empty() {
            return None;
        }
        Some(id.to_string())
    }
}
