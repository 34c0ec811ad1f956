//! Resampling a raster onto another raster's grid.
//!
//! Each target cell centre is located in the source grid:
//!
//! - when both rasters are georeferenced, through target transform → map
//!   coordinates → source transform;
//! - otherwise by proportional scaling, assuming both grids cover the same extent.
//!
//! Target cells falling outside the source grid are missing.

use rayon::prelude::*;
use tracing::debug;

use crate::domain::ResampleMethod;
use crate::error::AppError;
use crate::raster::Raster;

/// Resample `source` onto the shape and georeferencing of `template`.
pub fn resample(source: &Raster, template: &Raster, method: ResampleMethod) -> Result<Raster, AppError> {
    let (rows, cols) = template.shape();
    let (src_rows, src_cols) = source.shape();
    if src_rows == 0 || src_cols == 0 {
        return Err(AppError::input("Cannot resample an empty raster."));
    }

    let locate = Locator::new(source, template)?;
    debug!(
        from = ?source.shape(),
        to = ?template.shape(),
        ?method,
        georeferenced = locate.georeferenced(),
        "resampling layer"
    );

    let values: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|row| {
            let locate = &locate;
            (0..cols).map(move |col| {
                let (fr, fc) = locate.fractional(row, col);
                match method {
                    ResampleMethod::Nearest => sample_nearest(source, fr, fc),
                    ResampleMethod::Bilinear => sample_bilinear(source, fr, fc),
                }
            })
        })
        .collect();

    let mut out = Raster::from_vec(values, rows, cols)?;
    out.set_transform(template.transform());
    out.set_crs(template.crs().map(str::to_string));
    Ok(out)
}

/// Maps target cell indices to fractional source coordinates.
enum Locator {
    Geo {
        target: crate::raster::GeoTransform,
        source: crate::raster::GeoTransform,
    },
    Scaled {
        row_scale: f64,
        col_scale: f64,
    },
}

impl Locator {
    fn new(source: &Raster, template: &Raster) -> Result<Self, AppError> {
        match (template.transform(), source.transform()) {
            (Some(target), Some(src)) => {
                if src.geo_to_fractional(0.0, 0.0).is_none() {
                    return Err(AppError::input("Source raster has a degenerate geotransform."));
                }
                Ok(Locator::Geo { target, source: src })
            }
            _ => {
                let (rows, cols) = template.shape();
                let (src_rows, src_cols) = source.shape();
                Ok(Locator::Scaled {
                    row_scale: src_rows as f64 / rows.max(1) as f64,
                    col_scale: src_cols as f64 / cols.max(1) as f64,
                })
            }
        }
    }

    fn georeferenced(&self) -> bool {
        matches!(self, Locator::Geo { .. })
    }

    fn fractional(&self, row: usize, col: usize) -> (f64, f64) {
        match self {
            Locator::Geo { target, source } => {
                let (x, y) = target.cell_center(row, col);
                source.geo_to_fractional(x, y).unwrap_or((f64::NAN, f64::NAN))
            }
            Locator::Scaled { row_scale, col_scale } => {
                ((row as f64 + 0.5) * row_scale, (col as f64 + 0.5) * col_scale)
            }
        }
    }
}

fn sample_nearest(source: &Raster, fr: f64, fc: f64) -> f64 {
    if !(fr.is_finite() && fc.is_finite()) || fr < 0.0 || fc < 0.0 {
        return f64::NAN;
    }
    let (row, col) = (fr.floor() as usize, fc.floor() as usize);
    source.get(row, col).unwrap_or(f64::NAN)
}

fn sample_bilinear(source: &Raster, fr: f64, fc: f64) -> f64 {
    let (rows, cols) = source.shape();
    if !(fr.is_finite() && fc.is_finite())
        || fr < 0.0
        || fc < 0.0
        || fr >= rows as f64
        || fc >= cols as f64
    {
        return f64::NAN;
    }

    // Work in cell-centre coordinates; clamp the half-cell border to the edge.
    let v = (fr - 0.5).clamp(0.0, (rows - 1) as f64);
    let u = (fc - 0.5).clamp(0.0, (cols - 1) as f64);
    let r0 = v.floor() as usize;
    let c0 = u.floor() as usize;
    let r1 = (r0 + 1).min(rows - 1);
    let c1 = (c0 + 1).min(cols - 1);
    let dv = v - r0 as f64;
    let du = u - c0 as f64;

    // Corners with zero weight do not contribute, so a missing neighbour only
    // poisons cells that actually blend with it.
    let corners = [
        (r0, c0, (1.0 - dv) * (1.0 - du)),
        (r0, c1, (1.0 - dv) * du),
        (r1, c0, dv * (1.0 - du)),
        (r1, c1, dv * du),
    ];
    let mut acc = 0.0;
    for (r, c, w) in corners {
        if w <= 0.0 {
            continue;
        }
        let value = source.get(r, c).unwrap_or(f64::NAN);
        if !value.is_finite() {
            return f64::NAN;
        }
        acc += w * value;
    }
    acc
}
