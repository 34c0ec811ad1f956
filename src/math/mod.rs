//! Mathematical utilities: least squares, polynomials and the logistic link.

pub mod link;
pub mod ols;
pub mod poly;

pub use link::*;
pub use ols::*;
pub use poly::*;
