//! Input/output helpers.
//!
//! - GeoTIFF raster read/write (`geotiff`)
//! - tabular exports (CSV) (`export`)
//! - curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod geotiff;

pub use curve::*;
pub use export::*;
pub use geotiff::*;
