//! GeoTIFF read/write using the `tiff` crate.
//!
//! Only what the analysis needs is supported:
//!
//! - the first image of the file, any integer or float sample type, read as `f64`
//! - georeferencing from `ModelPixelScale` + `ModelTiepoint`
//! - the EPSG code from the GeoKey directory (projected or geographic)
//! - the GDAL nodata tag (converted to `NaN`)
//!
//! Rasters are written as 32-bit float with the same tags, so outputs open in
//! the usual GIS tools.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::Gray32Float;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::AppError;
use crate::raster::{GeoTransform, Raster};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Read the first band of a GeoTIFF into a `Raster`.
pub fn read_raster(path: &Path) -> Result<Raster, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open raster '{}': {e}", path.display())))?;
    let raster = decode(BufReader::new(file))
        .map_err(|msg| AppError::input(format!("Invalid raster '{}': {msg}", path.display())))?;

    debug!(
        path = %path.display(),
        rows = raster.rows(),
        cols = raster.cols(),
        missing = raster.count_missing(),
        georeferenced = raster.transform().is_some(),
        "read raster"
    );
    Ok(raster)
}

fn decode<R: Read + Seek>(reader: R) -> Result<Raster, String> {
    let mut decoder = Decoder::new(reader).map_err(|e| format!("TIFF decode error: {e}"))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("cannot read dimensions: {e}"))?;
    let (rows, cols) = (height as usize, width as usize);

    let image = decoder.read_image().map_err(|e| format!("cannot read image data: {e}"))?;
    let single_precision = matches!(image, DecodingResult::F32(_));
    let values: Vec<f64> = match image {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        _ => return Err("unsupported sample format".to_string()),
    };

    // Multi-sample images interleave bands; keep the first.
    let samples = values.len() / (rows * cols).max(1);
    let mut values: Vec<f64> = if samples > 1 {
        values.into_iter().step_by(samples).collect()
    } else {
        values
    };
    if values.len() != rows * cols {
        return Err(format!("expected {} cells, decoded {}", rows * cols, values.len()));
    }

    if let Some(nodata) = read_nodata(&mut decoder) {
        // f32 samples only match the sentinel at the precision they were stored in.
        let is_nodata = |v: f64| {
            if single_precision {
                v as f32 == nodata as f32
            } else {
                v == nodata
            }
        };
        for v in values.iter_mut().filter(|v| is_nodata(**v)) {
            *v = f64::NAN;
        }
    }

    let mut raster = Raster::from_vec(values, rows, cols).map_err(|e| e.to_string())?;
    raster.set_transform(read_transform(&mut decoder));
    raster.set_crs(read_crs(&mut decoder));
    Ok(raster)
}

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint = [I, J, K, X, Y, Z] ties raster point (I, J) to map point (X, Y).
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from `ProjectedCSTypeGeoKey` or `GeographicTypeGeoKey`.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<String> {
    let keys = decoder.get_tag_u32_vec(tag(GEO_KEY_DIRECTORY)).ok()?;
    // [version, revision, minor, count, (id, location, count, value)*]
    let count = *keys.get(3)? as usize;
    keys.get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|key| {
            let id = key[0] as u16;
            // location 0 means the value is stored inline
            (id == PROJECTED_CS_TYPE_KEY || id == GEOGRAPHIC_TYPE_KEY) && key[1] == 0 && key[3] > 0
        })
        .map(|key| format!("EPSG:{}", key[3]))
}

/// GeoKey directory for a written raster; the EPSG code is kept when it fits a short.
fn geokey_directory(crs: Option<&str>) -> Vec<u16> {
    let epsg = crs
        .and_then(|c| c.strip_prefix("EPSG:"))
        .and_then(|code| code.trim().parse::<u16>().ok())
        .filter(|&code| code > 0);
    // EPSG 4000-4999 are geographic coordinate systems.
    let geographic = epsg.is_some_and(|code| (4000..5000).contains(&code));

    let mut keys = vec![1, 1, 0, 2];
    keys.extend([GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 }]);
    keys.extend([GT_RASTER_TYPE_KEY, 0, 1, 1]);
    if let Some(code) = epsg {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        keys.extend([key, 0, 1, code]);
        keys[3] = 3;
    }
    keys
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(tag(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Write a raster as a single-band 32-bit float GeoTIFF.
pub fn write_raster(raster: &Raster, path: &Path) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create raster '{}': {e}", path.display())))?;
    let fail = |what: &str, e: tiff::TiffError| {
        AppError::input(format!("Failed to write {what} to '{}': {e}", path.display()))
    };

    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(|e| fail("TIFF header", e))?;
    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster.values().map(|v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| fail("image directory", e))?;

    if let Some(gt) = raster.transform() {
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])
            .map_err(|e| fail("pixel scale", e))?;
        image
            .encoder()
            .write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])
            .map_err(|e| fail("tiepoint", e))?;
    }
    if raster.transform().is_some() || raster.crs().is_some() {
        let geokeys = geokey_directory(raster.crs());
        image
            .encoder()
            .write_tag(tag(GEO_KEY_DIRECTORY), &geokeys[..])
            .map_err(|e| fail("geokeys", e))?;
    }
    image
        .encoder()
        .write_tag(tag(GDAL_NODATA), "nan")
        .map_err(|e| fail("nodata", e))?;

    image.write_data(&data).map_err(|e| fail("pixels", e))?;

    debug!(path = %path.display(), rows, cols, "wrote raster");
    Ok(())
}
