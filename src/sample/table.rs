//! Row-aligned feature tables built from rasters.
//!
//! Every aligned layer contributes one column; each grid cell becomes one row.
//! Rows with any missing value are dropped, but each surviving row remembers the
//! cell it came from so per-row predictions can be placed back onto the grid.

use crate::error::AppError;
use crate::raster::Raster;

#[derive(Debug, Clone)]
pub struct FeatureTable {
    names: Vec<String>,
    /// Row-major values, `n_rows * n_features`.
    values: Vec<f64>,
    /// Flat (row-major) grid index of each row.
    cells: Vec<usize>,
    grid_shape: (usize, usize),
}

impl FeatureTable {
    /// Flatten aligned layers into a table, dropping rows with missing values.
    pub fn from_layers(layers: &[(&str, &Raster)]) -> Result<Self, AppError> {
        let Some((_, first)) = layers.first() else {
            return Err(AppError::input("A feature table needs at least one layer."));
        };
        for (name, layer) in layers {
            first.ensure_same_shape(layer, name)?;
        }

        let n_features = layers.len();
        let grid_shape = first.shape();
        let columns: Vec<Vec<f64>> = layers.iter().map(|(_, r)| r.values().collect()).collect();

        let mut values = Vec::with_capacity(first.len() * n_features);
        let mut cells = Vec::new();
        for cell in 0..first.len() {
            if columns.iter().all(|col| col[cell].is_finite()) {
                values.extend(columns.iter().map(|col| col[cell]));
                cells.push(cell);
            }
        }

        Ok(Self {
            names: layers.iter().map(|(name, _)| name.to_string()).collect(),
            values,
            cells,
            grid_shape,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.cells.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn grid_shape(&self) -> (usize, usize) {
        self.grid_shape
    }

    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let p = self.n_features();
        &self.values[i * p..(i + 1) * p]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.n_features().max(1))
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows().map(|row| row[j]).collect()
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.names.iter().position(|n| n == name)?;
        Some(self.column(j))
    }

    /// Split one column off as a target vector.
    pub fn split_off_column(&self, name: &str) -> Result<(FeatureTable, Vec<f64>), AppError> {
        let Some(j) = self.names.iter().position(|n| n == name) else {
            return Err(AppError::input(format!("No column named '{name}' in feature table.")));
        };
        let target = self.column(j);
        let mut values = Vec::with_capacity(self.n_rows() * (self.n_features() - 1));
        for row in self.rows() {
            values.extend(row.iter().enumerate().filter(|(k, _)| *k != j).map(|(_, v)| *v));
        }
        let mut names = self.names.clone();
        names.remove(j);
        Ok((
            FeatureTable {
                names,
                values,
                cells: self.cells.clone(),
                grid_shape: self.grid_shape,
            },
            target,
        ))
    }

    /// Keep only the listed rows (in the given order).
    pub fn select_rows(&self, indices: &[usize]) -> FeatureTable {
        let mut values = Vec::with_capacity(indices.len() * self.n_features());
        let mut cells = Vec::with_capacity(indices.len());
        for &i in indices {
            values.extend_from_slice(self.row(i));
            cells.push(self.cells[i]);
        }
        FeatureTable {
            names: self.names.clone(),
            values,
            cells,
            grid_shape: self.grid_shape,
        }
    }

    /// Place one value per row back onto the grid; dropped cells are missing.
    pub fn scatter_to_grid(&self, per_row: &[f64], template: &Raster) -> Result<Raster, AppError> {
        if per_row.len() != self.n_rows() {
            return Err(AppError::numeric(format!(
                "Got {} predictions for {} table rows.",
                per_row.len(),
                self.n_rows()
            )));
        }
        if template.shape() != self.grid_shape {
            return Err(AppError::numeric(format!(
                "Prediction grid {:?} differs from table grid {:?}.",
                template.shape(),
                self.grid_shape
            )));
        }
        let mut out = template.like(f64::NAN);
        let cols = self.grid_shape.1;
        for (&cell, &value) in self.cells.iter().zip(per_row) {
            out.data_mut()[(cell / cols, cell % cols)] = value;
        }
        Ok(out)
    }
}
