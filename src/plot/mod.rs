//! Plotting: ASCII terminal plots and SVG charts/maps.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
