//! Reporting utilities: formatted terminal output and the markdown report.

pub mod format;
pub mod markdown;

pub use format::*;
pub use markdown::*;
