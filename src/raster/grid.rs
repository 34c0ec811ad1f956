//! The `Raster` grid type.
//!
//! Cells are `f64` stored row-major in an `ndarray::Array2`. A missing cell is
//! `NaN`; nodata sentinels from input files are converted on read so the rest
//! of the pipeline only has to test `is_finite()`.

use ndarray::Array2;

use crate::error::AppError;
use crate::raster::GeoTransform;

#[derive(Debug, Clone)]
pub struct Raster {
    data: Array2<f64>,
    transform: Option<GeoTransform>,
    crs: Option<String>,
}

impl Raster {
    /// A `rows × cols` raster with every cell missing.
    pub fn missing(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, f64::NAN)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: None,
            crs: None,
        }
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self {
            data,
            transform: None,
            crs: None,
        }
    }

    /// Build a raster from row-major values.
    pub fn from_vec(values: Vec<f64>, rows: usize, cols: usize) -> Result<Self, AppError> {
        if values.len() != rows * cols {
            return Err(AppError::numeric(format!(
                "Raster buffer holds {} values, expected {rows}x{cols}.",
                values.len()
            )));
        }
        let data = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| AppError::numeric(format!("Raster shape error: {e}")))?;
        Ok(Self::from_array(data))
    }

    /// Same shape and georeferencing, new values.
    pub fn with_data(&self, data: Array2<f64>) -> Result<Self, AppError> {
        if data.dim() != self.data.dim() {
            return Err(AppError::numeric(format!(
                "Derived raster shape {:?} differs from its source {:?}.",
                data.dim(),
                self.data.dim()
            )));
        }
        Ok(Self {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
        })
    }

    /// Same shape and georeferencing, every cell set to `value`.
    pub fn like(&self, value: f64) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), value),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    /// Elementwise map preserving georeferencing.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.mapv(f),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }

    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_none_or(|v| !v.is_finite())
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Row-major cell values.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    pub fn transform(&self) -> Option<GeoTransform> {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Option<GeoTransform>) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn set_crs(&mut self, crs: Option<String>) {
        self.crs = crs;
    }

    pub fn count_missing(&self) -> usize {
        self.data.iter().filter(|v| !v.is_finite()).count()
    }

    /// `(min, max)` over finite cells.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Mean over finite cells.
    pub fn finite_mean(&self) -> Option<f64> {
        let (sum, n) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Fail unless `other` has the same shape.
    pub fn ensure_same_shape(&self, other: &Raster, what: &str) -> Result<(), AppError> {
        if self.shape() != other.shape() {
            return Err(AppError::numeric(format!(
                "Grid mismatch for {what}: {:?} vs {:?}. Resample onto the reference grid first.",
                self.shape(),
                other.shape()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Raster::from_vec(vec![1.0, 2.0, 3.0], 2, 2).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn finite_stats_skip_missing() {
        let r = Raster::from_vec(vec![1.0, f64::NAN, 3.0, 5.0], 2, 2).unwrap();
        assert_eq!(r.finite_range(), Some((1.0, 5.0)));
        assert_eq!(r.finite_mean(), Some(3.0));
        assert_eq!(r.count_missing(), 1);
        assert!(r.is_missing(0, 1));
        assert!(r.is_missing(9, 9));
    }

    #[test]
    fn all_missing_has_no_range() {
        let r = Raster::missing(3, 3);
        assert_eq!(r.finite_range(), None);
        assert_eq!(r.finite_mean(), None);
    }

    #[test]
    fn like_keeps_georeferencing() {
        let mut r = Raster::filled(2, 3, 1.0);
        r.set_transform(Some(GeoTransform::new(0.0, 0.0, 1.0, -1.0)));
        r.set_crs(Some("EPSG:5070".to_string()));
        let z = r.like(0.0);
        assert_eq!(z.shape(), (2, 3));
        assert_eq!(z.transform(), r.transform());
        assert_eq!(z.crs(), Some("EPSG:5070"));
    }
}
