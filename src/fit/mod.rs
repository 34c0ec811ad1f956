//! Trend-curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit degree 1–3 polynomials to binned accessibility/density samples
//! - compare them by AIC or BIC with a simplicity guardrail

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
