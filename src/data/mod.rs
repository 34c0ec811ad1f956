//! Study-area data: the layer catalogue and a synthetic generator.

pub mod layers;
pub mod synthetic;

pub use layers::*;
pub use synthetic::*;
