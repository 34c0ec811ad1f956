//! `landuse-es` library crate.
//!
//! The binary (`lues`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - raster, sampling and model code stay reusable from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod raster;
pub mod report;
pub mod sample;
