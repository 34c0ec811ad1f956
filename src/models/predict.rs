//! Apply a fitted classifier to every usable cell.

use rayon::prelude::*;

use crate::error::AppError;
use crate::models::Classifier;
use crate::raster::Raster;
use crate::sample::FeatureTable;

/// Positive-class probability for every table row.
pub fn predict_table(model: &dyn Classifier, table: &FeatureTable) -> Vec<f64> {
    (0..table.n_rows())
        .into_par_iter()
        .map(|i| model.predict_proba_row(table.row(i)))
        .collect()
}

/// Probability surface on the template grid; cells without a table row stay missing.
pub fn predict_grid(model: &dyn Classifier, table: &FeatureTable, template: &Raster) -> Result<Raster, AppError> {
    let proba = predict_table(model, table);
    table.scatter_to_grid(&proba, template)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FirstFeature;

    impl Classifier for FirstFeature {
        fn name(&self) -> &'static str {
            "identity"
        }

        fn predict_proba_row(&self, row: &[f64]) -> f64 {
            row[0]
        }
    }

    #[test]
    fn grid_prediction_keeps_gaps() {
        let layer = Raster::from_vec(vec![0.2, f64::NAN, 0.7, 0.9], 2, 2).unwrap();
        let table = FeatureTable::from_layers(&[("a", &layer)]).unwrap();
        assert_eq!(predict_table(&FirstFeature, &table), vec![0.2, 0.7, 0.9]);

        let grid = predict_grid(&FirstFeature, &table, &layer).unwrap();
        assert_eq!(grid.get(0, 0), Some(0.2));
        assert!(grid.get(0, 1).unwrap().is_nan());
        assert_eq!(grid.get(1, 1), Some(0.9));
    }
}
