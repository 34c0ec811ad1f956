//! Moving-window statistics.

use rayon::prelude::*;

use crate::error::AppError;
use crate::raster::Raster;

/// Mean over a `(2r+1)²` square window, ignoring missing neighbours.
///
/// A missing centre cell stays missing. `radius == 0` returns a copy.
pub fn focal_mean(raster: &Raster, radius: usize) -> Result<Raster, AppError> {
    if radius == 0 {
        return Ok(raster.clone());
    }
    let (rows, cols) = raster.shape();
    let data = raster.data();

    let values: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|row| {
            (0..cols).map(move |col| {
                if !data[(row, col)].is_finite() {
                    return f64::NAN;
                }
                let r0 = row.saturating_sub(radius);
                let r1 = (row + radius).min(rows - 1);
                let c0 = col.saturating_sub(radius);
                let c1 = (col + radius).min(cols - 1);
                let mut sum = 0.0;
                let mut n = 0usize;
                for r in r0..=r1 {
                    for c in c0..=c1 {
                        let v = data[(r, c)];
                        if v.is_finite() {
                            sum += v;
                            n += 1;
                        }
                    }
                }
                sum / n as f64
            })
        })
        .collect();

    let mut out = Raster::from_vec(values, rows, cols)?;
    out.set_transform(raster.transform());
    out.set_crs(raster.crs().map(str::to_string));
    Ok(out)
}
