//! GeoTIFF GeoKey directory decoding.
//!
//! Both GeoTIFF rasters (tag 34735) and LAS point clouds (VLR record 34735)
//! embed the same key directory: a header quad followed by one quad per key.
//!
//! Directory layout (array of u16):
//!   0..4  : KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
//!   then per key: KeyId, TiffTagLocation, Count, ValueOffset
//!
//! When TiffTagLocation is 0 the value is stored inline in ValueOffset,
//! which is where the EPSG codes of interest live.

/// ProjectedCSTypeGeoKey: EPSG code of a projected CRS.
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
/// GeographicTypeGeoKey: EPSG code of a geographic CRS.
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
/// Marker for user-defined or unknown values.
const USER_DEFINED: u16 = 32767;

/// Extract the EPSG code from a GeoKey directory.
///
/// Prefers the projected CRS key over the geographic one, since tiled
/// survey products are delivered in projected coordinates. Returns `None`
/// for truncated directories, user-defined CRSs, and directories carrying
/// neither key.
pub fn epsg_from_geokeys(entries: &[u16]) -> Option<u32> {
    if entries.len() < 4 {
        return None;
    }
    let number_of_keys = entries[3] as usize;
    let mut geographic = None;
    for i in 0..number_of_keys {
        let base = 4 + i * 4;
        if base + 3 >= entries.len() {
            break;
        }
        let key_id = entries[base];
        let tag_location = entries[base + 1];
        let value = entries[base + 3];
        if tag_location != 0 || value == USER_DEFINED || value == 0 {
            continue;
        }
        match key_id {
            KEY_PROJECTED_CS_TYPE => return Some(value as u32),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value as u32),
            _ => {}
        }
    }
    geographic
}

/// Extract the EPSG code of the outermost CRS from a WKT definition.
///
/// Looks for `AUTHORITY["EPSG","nnnn"]` (WKT1) or `ID["EPSG",nnnn]` (WKT2)
/// and takes the last occurrence, which identifies the whole CRS rather
/// than one of its nested components.
pub fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    let mut last = None;
    let mut rest = wkt;
    while let Some(pos) = rest.find("EPSG") {
        let tail = &rest[pos + 4..];
        let digits: String = tail
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        // Only accept codes adjacent to the EPSG token, not digits from
        // some later part of the string.
        let gap = tail
            .chars()
            .take_while(|c| !c.is_ascii_digit())
            .all(|c| matches!(c, '"' | '\'' | ',' | ':' | ' ' | '[' | ']'));
        if gap && !digits.is_empty() {
            if let Ok(code) = digits.parse() {
                last = Some(code);
            }
        }
        rest = &rest[pos + 4..];
    }
    last
}

/// Format an EPSG code as a CRS identifier string.
pub fn format_epsg(code: u32) -> String {
    format!("EPSG:{code}")
}
