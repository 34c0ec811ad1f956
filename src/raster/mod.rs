//! Raster grids and the transformations applied to them.
//!
//! - `Raster` + `GeoTransform` (`grid`, `geotransform`)
//! - normalization, null-masking and layer arithmetic (`ops`)
//! - resampling onto a reference grid (`resample`)
//! - land-use reclassification (`reclass`)
//! - moving-window density (`focal`)

pub mod focal;
pub mod geotransform;
pub mod grid;
pub mod ops;
pub mod reclass;
pub mod resample;

pub use focal::focal_mean;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use ops::*;
pub use reclass::*;
pub use resample::resample;
