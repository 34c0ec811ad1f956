//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`LandUseClass`, `ResampleMethod`, `Criterion`, `CurveSpec`)
//! - binned observations (`Bin`)
//! - fit outputs (`FitResult`, `CurveModel`, `CurveFile`)

pub mod types;

pub use types::*;
