//! Regression-ready samples: flattened feature tables and binned trends.

pub mod binning;
pub mod table;

pub use binning::bin_samples;
pub use table::FeatureTable;
