//! Land-use probability models.
//!
//! Both models are binary classifiers over the four driver layers and share one
//! seam (`Classifier`) so evaluation and grid prediction stay model-agnostic.

pub mod gbt;
pub mod logistic;
pub mod metrics;
pub mod predict;
pub mod split;
pub mod tree;

pub use gbt::*;
pub use logistic::*;
pub use metrics::*;
pub use predict::*;
pub use split::*;

/// A fitted binary classifier producing positive-class probabilities.
pub trait Classifier: Sync {
    /// Short human-readable name for reports.
    fn name(&self) -> &'static str;

    /// Probability of the positive class for one feature row.
    fn predict_proba_row(&self, row: &[f64]) -> f64;
}
