//! GeoPackage geometry blob encoding.
//!
//! A GeoPackage geometry is a small binary header followed by standard
//! WKB (little-endian):
//!
//!   00 : [u8;2] magic = b"GP"
//!   02 : u8     version = 0
//!   03 : u8     flags: bit 0 = little-endian header,
//!               bits 1-3 = envelope indicator (1 = XY envelope)
//!   04 : i32    srs id
//!   08 : f64[4] envelope: min x, max x, min y, max y
//!   28 : WKB polygon (byte order, type = 3, ring count, point count,
//!        ring points)
//!
//! Tile footprints are axis-aligned rectangles, so every geometry is one
//! closed five-point ring.

use byteorder::{LittleEndian, WriteBytesExt};
use lidarqc_core::Bounds;

const GPKG_MAGIC: [u8; 2] = *b"GP";
/// Little-endian header with an XY envelope.
const FLAGS_LE_XY_ENVELOPE: u8 = 0b0000_0011;
const WKB_LITTLE_ENDIAN: u8 = 1;
const WKB_POLYGON: u32 = 3;

/// Encode a rectangle as a GeoPackage polygon blob.
pub fn polygon_blob(bounds: &Bounds, srs_id: i32) -> Vec<u8> {
    // Header (8) + envelope (32) + WKB polygon with one 5-point ring (93).
    let mut out = Vec::with_capacity(8 + 32 + 9 + 4 + 80);
    out.extend_from_slice(&GPKG_MAGIC);
    out.push(0); // version
    out.push(FLAGS_LE_XY_ENVELOPE);
    out.write_i32::<LittleEndian>(srs_id).unwrap();
    for v in [bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y] {
        out.write_f64::<LittleEndian>(v).unwrap();
    }

    out.push(WKB_LITTLE_ENDIAN);
    out.write_u32::<LittleEndian>(WKB_POLYGON).unwrap();
    out.write_u32::<LittleEndian>(1).unwrap(); // ring count
    out.write_u32::<LittleEndian>(5).unwrap(); // closed ring points
    let ring = [
        (bounds.min_x, bounds.min_y),
        (bounds.max_x, bounds.min_y),
        (bounds.max_x, bounds.max_y),
        (bounds.min_x, bounds.max_y),
        (bounds.min_x, bounds.min_y),
    ];
    for (x, y) in ring {
        out.write_f64::<LittleEndian>(x).unwrap();
        out.write_f64::<LittleEndian>(y).unwrap();
    }
    out
}
