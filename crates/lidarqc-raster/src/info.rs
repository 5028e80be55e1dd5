//! Metadata-only GeoTIFF read.

use crate::Result;
use lidarqc_core::{epsg_from_geokeys, Bounds};
use std::path::Path;
use tiff::decoder::ifd::Value;
use tiff::decoder::Decoder;
use tiff::tags::Tag;

/// GeoTIFF tag: ModelPixelScale (cell size in CRS units).
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GeoTIFF tag: ModelTiepoint (pixel-to-CRS anchor).
const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GeoTIFF tag: GeoKeyDirectory.
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
/// GDAL tag: nodata value as an ASCII string.
const TAG_GDAL_NODATA: u16 = 42113;

/// Metadata extracted from a raster file's header and tag directory.
#[derive(Debug, Clone)]
pub struct RasterInfo {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// Cell size (x, y) in CRS units, when the file is georeferenced.
    pub pixel_size: Option<(f64, f64)>,
    /// CRS coordinates of the top-left corner.
    pub origin: Option<(f64, f64)>,
    /// Data extent in the file's CRS.
    pub bounds: Option<Bounds>,
    /// EPSG code from the GeoKey directory, when present and not
    /// user-defined.
    pub epsg: Option<u32>,
    /// Nodata value, when the file declares one.
    pub nodata: Option<f64>,
}

impl RasterInfo {
    /// Read raster metadata from a GeoTIFF file.
    ///
    /// Only the header and tag directory are touched; pixel payload is
    /// never decoded. Missing georeferencing tags leave the corresponding
    /// fields `None` rather than failing the read - an image that decodes
    /// but carries no geotransform is still a readable file, just not a
    /// placeable one.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut decoder = Decoder::new(file)?;

        let (width, height) = decoder.dimensions()?;

        // ModelTiepoint format: [i, j, k, x, y, z] where (i, j) is pixel
        // coords and (x, y) is CRS coords. Survey rasters anchor pixel
        // (0, 0) at the top-left corner.
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
            .ok();
        let pixel_scale = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
            .ok();

        let mut origin = None;
        let mut pixel_size = None;
        let mut bounds = None;
        if let (Some(tiepoint), Some(scale)) = (tiepoint, pixel_scale) {
            if tiepoint.len() >= 6 && scale.len() >= 2 {
                let tie_x = tiepoint[3];
                let tie_y = tiepoint[4];
                let scale_x = scale[0];
                let scale_y = scale[1];
                origin = Some((tie_x, tie_y));
                pixel_size = Some((scale_x, scale_y));
                bounds = Some(bounds_from_geotransform(
                    width, height, tie_x, tie_y, scale_x, scale_y,
                ));
            }
        }

        let epsg = decoder
            .get_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY))
            .ok()
            .and_then(|value| epsg_from_geokeys(&geokey_entries(&value)));

        let nodata = decoder
            .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_end_matches('\0').trim().parse().ok());

        Ok(Self {
            width,
            height,
            pixel_size,
            origin,
            bounds,
            epsg,
            nodata,
        })
    }

    /// Total cell count.
    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Flatten a GeoKeyDirectory tag value into its u16 entries.
///
/// The directory is declared as SHORT; widened values are narrowed back.
fn geokey_entries(value: &Value) -> Vec<u16> {
    let Value::List(values) = value else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(|v| match v {
            Value::Short(v) => Some(*v),
            Value::Unsigned(v) => u16::try_from(*v).ok(),
            Value::UnsignedBig(v) => u16::try_from(*v).ok(),
            _ => None,
        })
        .collect()
}

/// Compute the data extent from a top-left anchored geotransform.
///
/// The tiepoint is the top-left corner; rows advance southward, so the
/// minimum northing is the tiepoint minus the full raster height.
fn bounds_from_geotransform(
    width: u32,
    height: u32,
    tie_x: f64,
    tie_y: f64,
    scale_x: f64,
    scale_y: f64,
) -> Bounds {
    Bounds::new(
        tie_x,
        tie_y - height as f64 * scale_y,
        tie_x + width as f64 * scale_x,
        tie_y,
    )
}
