//! Elementwise raster transformations.
//!
//! All operations treat non-finite cells as missing and propagate them. Binary
//! operations require both grids to share one shape and inherit georeferencing
//! from the left operand.

use ndarray::Zip;

use crate::error::AppError;
use crate::raster::Raster;

/// Rescale finite values to `[0, 1]` using the raster's own min/max.
///
/// Missing cells stay missing. A constant raster maps to all zeros, and a raster
/// with no finite cell is returned unchanged.
pub fn normalize(raster: &Raster) -> Raster {
    let Some((lo, hi)) = raster.finite_range() else {
        return raster.clone();
    };
    let span = hi - lo;
    raster.map(|v| {
        if !v.is_finite() {
            f64::NAN
        } else if span <= 0.0 {
            0.0
        } else {
            ((v - lo) / span).clamp(0.0, 1.0)
        }
    })
}

/// Set `target` cells to missing wherever `reference` is missing.
pub fn mask_nulls(target: &Raster, reference: &Raster) -> Result<Raster, AppError> {
    target.ensure_same_shape(reference, "null mask")?;
    let mut out = target.clone();
    Zip::from(out.data_mut())
        .and(reference.data())
        .for_each(|t, &r| {
            if !r.is_finite() {
                *t = f64::NAN;
            }
        });
    Ok(out)
}

/// Apply one reference extent to a set of layers.
pub fn mask_to_extent(layers: &[&Raster], reference: &Raster) -> Result<Vec<Raster>, AppError> {
    layers.iter().map(|layer| mask_nulls(layer, reference)).collect()
}

/// Combine two aligned rasters cell by cell.
pub fn zip_with(a: &Raster, b: &Raster, f: impl Fn(f64, f64) -> f64) -> Result<Raster, AppError> {
    a.ensure_same_shape(b, "elementwise operation")?;
    let mut data = a.data().clone();
    Zip::from(&mut data).and(b.data()).for_each(|x, &y| {
        *x = if x.is_finite() && y.is_finite() { f(*x, y) } else { f64::NAN };
    });
    a.with_data(data)
}

pub fn multiply(a: &Raster, b: &Raster) -> Result<Raster, AppError> {
    zip_with(a, b, |x, y| x * y)
}

/// Gravity-style attraction: `magnitude / max(travel_time, 1)^beta`.
///
/// Travel times below one unit are treated as one so a factor located in the
/// cell itself keeps its full magnitude.
pub fn gravity_attraction(magnitude: &Raster, travel_time: &Raster, beta: f64) -> Result<Raster, AppError> {
    if !(beta.is_finite() && beta >= 0.0) {
        return Err(AppError::input(format!("Invalid distance-decay exponent {beta}.")));
    }
    zip_with(magnitude, travel_time, |m, t| m / t.max(1.0).powf(beta))
}

/// Ecosystem-service accessibility surface.
///
/// Both inputs must already sit on the reference grid. The index is the
/// normalized product of the normalized ecosystem-service magnitude and the
/// normalized road density, so it is high only where services are both
/// plentiful and reachable.
pub fn ecosystem_accessibility(es_index: &Raster, road_density: &Raster) -> Result<Raster, AppError> {
    let product = multiply(&normalize(es_index), &normalize(road_density))?;
    Ok(normalize(&product))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(values: &[f64], rows: usize, cols: usize) -> Raster {
        Raster::from_vec(values.to_vec(), rows, cols).unwrap()
    }

    #[test]
    fn normalize_maps_extremes_and_keeps_missing() {
        let r = raster(&[2.0, 4.0, f64::NAN, 6.0], 2, 2);
        let n = normalize(&r);
        let v: Vec<f64> = n.values().collect();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[1], 0.5);
        assert!(v[2].is_nan());
        assert_eq!(v[3], 1.0);
    }

    #[test]
    fn normalize_is_idempotent() {
        let r = raster(&[-3.0, 0.25, 7.5, f64::NAN, 11.0, 2.0], 2, 3);
        let once = normalize(&r);
        let twice = normalize(&once);
        for (a, b) in once.values().zip(twice.values()) {
            assert!((a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_constant_is_zero() {
        let r = raster(&[5.0, 5.0, f64::NAN], 1, 3);
        let v: Vec<f64> = normalize(&r).values().collect();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[1], 0.0);
        assert!(v[2].is_nan());
    }

    #[test]
    fn mask_output_missing_is_superset_of_reference() {
        let target = raster(&[1.0, f64::NAN, 3.0, 4.0], 2, 2);
        let reference = raster(&[f64::NAN, 1.0, 1.0, f64::NAN], 2, 2);
        let out = mask_nulls(&target, &reference).unwrap();
        for (o, r) in out.values().zip(reference.values()) {
            if r.is_nan() {
                assert!(o.is_nan());
            }
        }
        let v: Vec<f64> = out.values().collect();
        assert!(v[1].is_nan(), "target's own gaps survive");
        assert_eq!(v[2], 3.0);
    }

    #[test]
    fn mask_rejects_shape_mismatch() {
        let err = mask_nulls(&Raster::filled(2, 2, 1.0), &Raster::filled(3, 2, 1.0)).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn gravity_attraction_decays_with_time() {
        let m = raster(&[10.0, 10.0, 10.0], 1, 3);
        let t = raster(&[0.5, 2.0, f64::NAN], 1, 3);
        let a: Vec<f64> = gravity_attraction(&m, &t, 2.0).unwrap().values().collect();
        assert_eq!(a[0], 10.0);
        assert_eq!(a[1], 2.5);
        assert!(a[2].is_nan());
    }

    #[test]
    fn accessibility_is_unit_range() {
        let es = raster(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        let roads = raster(&[4.0, 3.0, 2.0, 1.0], 2, 2);
        let acc = ecosystem_accessibility(&es, &roads).unwrap();
        let (lo, hi) = acc.finite_range().unwrap();
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
    }
}
