//! LAS public header block and VLR parsing.
//!
//! Header layout (little-endian, LAS 1.0-1.4):
//!   000 : [u8;4]  signature = b"LASF"
//!   004 : u16     file source id
//!   006 : u16     global encoding
//!   008 : [u8;16] project GUID
//!   024 : u8,u8   version major, minor
//!   026 : [u8;32] system identifier
//!   058 : [u8;32] generating software
//!   090 : u16,u16 creation day of year, year
//!   094 : u16     header size
//!   096 : u32     offset to point data
//!   100 : u32     number of VLRs
//!   104 : u8      point data record format (bit 7 set by LAZ compressors)
//!   105 : u16     point data record length
//!   107 : u32     legacy number of point records
//!   111 : u32[5]  legacy number of points by return
//!   131 : f64[3]  x/y/z scale factor
//!   155 : f64[3]  x/y/z offset
//!   179 : f64[6]  max x, min x, max y, min y, max z, min z
//!   227 : end of LAS <= 1.3 header
//!   --- LAS 1.4 (header size 375) continues:
//!   227 : u64     start of waveform data packet record
//!   235 : u64     start of first EVLR
//!   243 : u32     number of EVLRs
//!   247 : u64     number of point records
//!   255 : u64[15] number of points by return
//!
//! Each VLR is a 54-byte header (reserved u16, user id [u8;16], record id
//! u16, record length u16, description [u8;32]) followed by its payload.
//! CRS information lives in the `LASF_Projection` VLRs: a GeoKey directory
//! (record 34735) or a WKT definition (record 2112).

use crate::{LasError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use lidarqc_core::{epsg_from_geokeys, epsg_from_wkt, Bounds};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

const LAS_SIGNATURE: [u8; 4] = *b"LASF";
const HEADER_LEN_LEGACY: usize = 227;
const HEADER_LEN_14: usize = 375;
const VLR_HEADER_LEN: u64 = 54;
const VLR_USER_PROJECTION: &str = "LASF_Projection";
const VLR_RECORD_GEOKEYS: u16 = 34735;
const VLR_RECORD_WKT: u16 = 2112;
/// LAZ compressors set the high bit of the point data record format.
const FORMAT_COMPRESSION_BIT: u8 = 0x80;
/// Offset of the x/y/z fields inside every point record format.
const POINT_XYZ_LEN: u16 = 12;

/// Metadata extracted from a LAS/LAZ file header.
#[derive(Debug, Clone)]
pub struct LasInfo {
    /// LAS version (major, minor).
    pub version: (u8, u8),
    /// Point data record format, with the compression bit stripped.
    pub point_format: u8,
    /// Point data record length in bytes.
    pub point_record_length: u16,
    /// Number of point records. LAS 1.4 files use the extended count when
    /// the legacy field is zero.
    pub point_count: u64,
    /// Data extent from the header (x/y only), or from the fallback scan.
    pub bounds: Option<Bounds>,
    /// EPSG code from the projection VLRs, when present.
    pub epsg: Option<u32>,
    /// True for LAZ-compressed point payloads.
    pub compressed: bool,
    /// True when count/bounds were recomputed by the fallback scan.
    pub recomputed: bool,
    /// True when the header is inconsistent and could not be recomputed
    /// (compressed payload, or records too short to walk).
    pub suspect: bool,
}

impl LasInfo {
    /// Read LAS/LAZ metadata from a file.
    ///
    /// `max_scan_points` bounds the fallback scan used when the header is
    /// internally inconsistent; the scan walks at most that many point
    /// records when re-measuring the extent.
    pub fn from_file<P: AsRef<Path>>(path: P, max_scan_points: u64) -> Result<Self> {
        let path = path.as_ref();
        let laz_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("laz"));

        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_LEN_LEGACY];
        if (file_len as usize) < HEADER_LEN_LEGACY {
            return Err(LasError::TruncatedHeader {
                got: file_len as usize,
                need: HEADER_LEN_LEGACY,
            });
        }
        reader.read_exact(&mut header)?;
        let mut cursor = Cursor::new(&header[..]);

        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature)?;
        if signature != LAS_SIGNATURE {
            return Err(LasError::BadSignature(signature));
        }

        cursor.seek(SeekFrom::Start(24))?;
        let version_major = cursor.read_u8()?;
        let version_minor = cursor.read_u8()?;

        cursor.seek(SeekFrom::Start(94))?;
        let header_size = cursor.read_u16::<LittleEndian>()?;
        let offset_to_points = cursor.read_u32::<LittleEndian>()? as u64;
        let vlr_count = cursor.read_u32::<LittleEndian>()?;
        let raw_format = cursor.read_u8()?;
        let point_record_length = cursor.read_u16::<LittleEndian>()?;
        let legacy_count = cursor.read_u32::<LittleEndian>()? as u64;

        cursor.seek(SeekFrom::Start(131))?;
        let x_scale = cursor.read_f64::<LittleEndian>()?;
        let y_scale = cursor.read_f64::<LittleEndian>()?;
        let _z_scale = cursor.read_f64::<LittleEndian>()?;
        let x_offset = cursor.read_f64::<LittleEndian>()?;
        let y_offset = cursor.read_f64::<LittleEndian>()?;
        let _z_offset = cursor.read_f64::<LittleEndian>()?;
        let max_x = cursor.read_f64::<LittleEndian>()?;
        let min_x = cursor.read_f64::<LittleEndian>()?;
        let max_y = cursor.read_f64::<LittleEndian>()?;
        let min_y = cursor.read_f64::<LittleEndian>()?;

        // LAS 1.4 moved the authoritative point count past the legacy
        // fields; the legacy count is zero when it cannot represent the
        // real total.
        let mut point_count = legacy_count;
        if version_minor >= 4 && header_size as usize >= HEADER_LEN_14 {
            let mut extension = [0u8; HEADER_LEN_14 - HEADER_LEN_LEGACY];
            reader.read_exact(&mut extension)?;
            let mut ext = Cursor::new(&extension[..]);
            ext.seek(SeekFrom::Start(20))?; // skip waveform + EVLR fields
            let extended_count = ext.read_u64::<LittleEndian>()?;
            if extended_count > 0 {
                point_count = extended_count;
            }
        }

        let compressed = laz_extension || raw_format & FORMAT_COMPRESSION_BIT != 0;
        let point_format = raw_format & !FORMAT_COMPRESSION_BIT;

        let epsg = read_projection_vlrs(
            &mut reader,
            header_size as u64,
            vlr_count,
            offset_to_points.min(file_len),
        );

        let header_bounds = header_bounds(min_x, min_y, max_x, max_y, point_count);
        let has_point_data = offset_to_points >= header_size as u64
            && file_len > offset_to_points
            && point_record_length > 0;
        let consistent = point_count > 0 && header_bounds.is_some();

        let mut info = Self {
            version: (version_major, version_minor),
            point_format,
            point_record_length,
            point_count,
            bounds: header_bounds,
            epsg,
            compressed,
            recomputed: false,
            suspect: false,
        };

        if consistent || !has_point_data {
            return Ok(info);
        }

        // Header is unusable but point data exists. Re-measure uncompressed
        // records directly; compressed payloads cannot be walked without
        // decoding, so those stay suspect.
        if compressed || point_record_length < POINT_XYZ_LEN {
            info.suspect = true;
            return Ok(info);
        }

        let scan = scan_points(
            &mut reader,
            offset_to_points,
            file_len,
            point_record_length,
            (x_scale, y_scale),
            (x_offset, y_offset),
            max_scan_points,
        )?;
        info.point_count = scan.total_records;
        info.bounds = scan.bounds;
        info.recomputed = true;
        Ok(info)
    }
}

/// Validate the header extent. Zeroed or inverted min/max fields mean the
/// producing software never filled them in.
fn header_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64, point_count: u64) -> Option<Bounds> {
    if min_x > max_x || min_y > max_y {
        return None;
    }
    let all_zero = min_x == 0.0 && max_x == 0.0 && min_y == 0.0 && max_y == 0.0;
    if all_zero && point_count != 1 {
        // A genuine single point at the exact origin is indistinguishable
        // from an unfilled header; every other count makes zeroes invalid.
        return None;
    }
    Some(Bounds::new(min_x, min_y, max_x, max_y))
}

/// Walk the VLR chain looking for `LASF_Projection` records.
///
/// Malformed VLRs terminate the walk silently; a file whose projection
/// records cannot be read simply has no CRS, which the caller records.
fn read_projection_vlrs<R: Read + Seek>(
    reader: &mut R,
    vlr_start: u64,
    vlr_count: u32,
    end: u64,
) -> Option<u32> {
    if reader.seek(SeekFrom::Start(vlr_start)).is_err() {
        return None;
    }
    let mut position = vlr_start;
    let mut from_geokeys = None;
    let mut from_wkt = None;
    for _ in 0..vlr_count {
        if position + VLR_HEADER_LEN > end {
            break;
        }
        let mut vlr_header = [0u8; VLR_HEADER_LEN as usize];
        if reader.read_exact(&mut vlr_header).is_err() {
            break;
        }
        let user_id = null_terminated(&vlr_header[2..18]);
        let record_id = u16::from_le_bytes([vlr_header[18], vlr_header[19]]);
        let record_len = u16::from_le_bytes([vlr_header[20], vlr_header[21]]) as u64;
        position += VLR_HEADER_LEN;
        if position + record_len > end {
            break;
        }

        let mut payload = vec![0u8; record_len as usize];
        if reader.read_exact(&mut payload).is_err() {
            break;
        }
        position += record_len;

        if user_id != VLR_USER_PROJECTION {
            continue;
        }
        match record_id {
            VLR_RECORD_GEOKEYS => {
                let entries: Vec<u16> = payload
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                from_geokeys = epsg_from_geokeys(&entries);
            }
            VLR_RECORD_WKT => {
                let wkt = String::from_utf8_lossy(&payload);
                from_wkt = epsg_from_wkt(&wkt);
            }
            _ => {}
        }
    }
    from_geokeys.or(from_wkt)
}

fn null_terminated(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}

struct ScanResult {
    total_records: u64,
    bounds: Option<Bounds>,
}

/// Bounded scan over uncompressed point records.
///
/// The record total comes from the file size (exact, cheap); the extent
/// comes from at most `max_scan_points` records.
fn scan_points<R: Read + Seek>(
    reader: &mut R,
    offset_to_points: u64,
    file_len: u64,
    record_length: u16,
    scale: (f64, f64),
    offset: (f64, f64),
    max_scan_points: u64,
) -> Result<ScanResult> {
    let total_records = (file_len - offset_to_points) / record_length as u64;
    let scan_count = total_records.min(max_scan_points);

    reader.seek(SeekFrom::Start(offset_to_points))?;
    let mut record = vec![0u8; record_length as usize];
    let mut bounds: Option<Bounds> = None;
    for _ in 0..scan_count {
        reader.read_exact(&mut record)?;
        let x_raw = i32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let y_raw = i32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        let x = x_raw as f64 * scale.0 + offset.0;
        let y = y_raw as f64 * scale.1 + offset.1;
        let point = Bounds::new(x, y, x, y);
        bounds = Some(match bounds {
            Some(b) => b.union(&point),
            None => point,
        });
    }

    Ok(ScanResult {
        total_records,
        bounds,
    })
}
